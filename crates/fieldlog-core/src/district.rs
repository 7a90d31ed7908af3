//! District classification by substring match against an ordered vocabulary.

/// One district: its canonical code and the spellings that also identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct District {
    pub code: String,
    pub aliases: Vec<String>,
}

impl District {
    pub fn new(code: &str, aliases: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn found_in(&self, address: &str) -> bool {
        address.contains(self.code.as_str())
            || self.aliases.iter().any(|a| address.contains(a.as_str()))
    }
}

/// Ordered district vocabulary.
///
/// Order is the tie-break: when an address contains several entries, the
/// earliest entry wins. Longer codes that embed shorter ones (`ЮЗАО`
/// contains `ЗАО`) must therefore come first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictVocabulary {
    entries: Vec<District>,
}

impl Default for DistrictVocabulary {
    /// Moscow administrative okrugs served by the field teams, with the
    /// Latin spellings people type from phones without a Cyrillic layout.
    fn default() -> Self {
        Self::new(vec![
            District::new("ЮЗАО", &["YuZAO", "YUZAO", "UZAO"]),
            District::new("ЗАО", &["ZAO"]),
            District::new("ТРАО", &["TRAO"]),
            District::new("НМАО", &["NMAO"]),
        ])
    }
}

impl DistrictVocabulary {
    pub fn new(entries: Vec<District>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[District] {
        &self.entries
    }

    /// Canonical code of the first entry found in `address`, or `""`.
    ///
    /// Case-sensitive substring containment; no token boundaries.
    pub fn classify(&self, address: &str) -> &str {
        if address.is_empty() {
            return "";
        }
        self.entries
            .iter()
            .find(|d| d.found_in(address))
            .map(|d| d.code.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyrillic_codes() {
        let v = DistrictVocabulary::default();
        assert_eq!(v.classify("ЗАО, ул. Ленина 5"), "ЗАО");
        assert_eq!(v.classify("ТРАО, Троицк"), "ТРАО");
        assert_eq!(v.classify("НМАО Коммунарка"), "НМАО");
    }

    #[test]
    fn longer_code_wins_by_order() {
        let v = DistrictVocabulary::default();
        // "ЮЗАО" contains "ЗАО"; the earlier entry wins.
        assert_eq!(v.classify("ЮЗАО, Профсоюзная 1"), "ЮЗАО");
        assert_eq!(v.classify("YuZAO, Profsoyuznaya 1"), "ЮЗАО");
    }

    #[test]
    fn earlier_entry_wins_when_both_present() {
        let v = DistrictVocabulary::default();
        assert_eq!(v.classify("НМАО / ЗАО border"), "ЗАО");
        assert_eq!(v.classify("TRAO near ZAO"), "ЗАО");
    }

    #[test]
    fn latin_alias_maps_to_canonical_code() {
        let v = DistrictVocabulary::default();
        assert_eq!(v.classify("ZAO, Lenina 5"), "ЗАО");
        assert_eq!(v.classify("NMAO, Kommunarka"), "НМАО");
    }

    #[test]
    fn case_sensitive() {
        let v = DistrictVocabulary::default();
        assert_eq!(v.classify("zao, lenina 5"), "");
        assert_eq!(v.classify("зао"), "");
    }

    #[test]
    fn substring_not_token() {
        let v = DistrictVocabulary::default();
        assert_eq!(v.classify("BAZAOR street"), "ЗАО");
    }

    #[test]
    fn empty_or_unmatched() {
        let v = DistrictVocabulary::default();
        assert_eq!(v.classify(""), "");
        assert_eq!(v.classify("Nevsky prospekt 1"), "");
    }

    #[test]
    fn custom_vocabulary_order_is_respected() {
        let v = DistrictVocabulary::new(vec![District::new("B", &[]), District::new("AB", &[])]);
        assert_eq!(v.classify("xAB"), "B");
        assert_eq!(v.entries().len(), 2);
    }
}
