//! Texts sent back to the reporter.

use crate::caption::ParsedFields;

const DUPLICATE_WARNING: &str = "⚠️ Это дублирующаяся заявка!";

/// Confirmation for an accepted report. Empty fields are left out.
pub fn acknowledgment(
    fields: &ParsedFields,
    photo_link: &str,
    duplicate: bool,
    chat_title: &str,
) -> String {
    let mut text = String::from("Данные приняты");
    if !chat_title.is_empty() {
        text.push_str(" из чата ");
        text.push_str(chat_title);
    }
    text.push_str(":\n");

    for (label, value) in [
        ("TT", fields.identifier.as_str()),
        ("Адрес", fields.address.as_str()),
        ("Округ", fields.district.as_str()),
        ("Фото", photo_link),
    ] {
        if !value.is_empty() {
            text.push_str(&format!("{label}: {value}\n"));
        }
    }

    if duplicate {
        text.push('\n');
        text.push_str(DUPLICATE_WARNING);
    }
    text
}

/// Corrective message for a caption without both required lines.
pub fn missing_fields(in_caption: bool) -> String {
    let head = if in_caption {
        "Ошибка: Не хватает данных в подписи."
    } else {
        "Ошибка: Не хватает данных."
    };
    format!("{head}\n1 строка - TT\n2 строка - Адрес")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(district: &str) -> ParsedFields {
        ParsedFields {
            identifier: "TT-551".into(),
            address: "ZAO, Lenina 5".into(),
            district: district.into(),
        }
    }

    #[test]
    fn plain_acknowledgment() {
        let text = acknowledgment(&fields("ЗАО"), "", false, "Field team");
        assert_eq!(
            text,
            "Данные приняты из чата Field team:\nTT: TT-551\nАдрес: ZAO, Lenina 5\nОкруг: ЗАО\n"
        );
    }

    #[test]
    fn skips_empty_district_and_title() {
        let text = acknowledgment(&fields(""), "", false, "");
        assert!(text.starts_with("Данные приняты:\n"));
        assert!(!text.contains("Округ"));
    }

    #[test]
    fn duplicate_with_photo() {
        let text = acknowledgment(&fields("ЗАО"), "https://drive/x", true, "Field team");
        assert!(text.contains("Фото: https://drive/x\n"));
        assert!(text.ends_with("\n\n⚠️ Это дублирующаяся заявка!"));
    }

    #[test]
    fn missing_fields_texts() {
        assert_eq!(
            missing_fields(false),
            "Ошибка: Не хватает данных.\n1 строка - TT\n2 строка - Адрес"
        );
        assert!(missing_fields(true).starts_with("Ошибка: Не хватает данных в подписи."));
    }
}
