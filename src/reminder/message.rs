//! Reminder text posted to the thread

use crate::config::Locale;
use crate::slack::UserId;

pub fn fully_acknowledged(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Everyone has reacted!",
        Locale::Ja => "全メンバーのリアクションが完了しています！",
    }
}

pub fn no_reactions(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "There are no reactions on this message.",
        Locale::Ja => "リアクションがありません",
    }
}

fn mention_line(missing: &[UserId]) -> String {
    missing
        .iter()
        .map(UserId::mention)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reminder asking for the single acknowledgement reaction
pub fn read_reminder(locale: Locale, missing: &[UserId], acknowledgement: &str) -> String {
    if missing.is_empty() {
        return fully_acknowledged(locale).to_string();
    }

    let prompt = match locale {
        Locale::En => format!("Please react with :{}:!", acknowledgement),
        Locale::Ja => format!("リアクション :{}: をお願いします！", acknowledgement),
    };
    format!("{}\n{}", mention_line(missing), prompt)
}

/// Reminder accepting any one of `candidates`
pub fn any_reminder(locale: Locale, missing: &[UserId], candidates: &[String]) -> String {
    if missing.is_empty() {
        return fully_acknowledged(locale).to_string();
    }

    let choices = candidates
        .iter()
        .map(|name| format!(" :{}: ", name))
        .collect::<Vec<_>>()
        .join("or");

    let prompt = match locale {
        Locale::En => format!("Please react with ({})!", choices),
        Locale::Ja => format!("リアクション（{}）をお願いします！", choices),
    };
    format!("{}\n{}", mention_line(missing), prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<UserId> {
        raw.iter().map(|u| UserId::new(*u)).collect()
    }

    #[test]
    fn test_read_reminder_mentions_missing_only() {
        let text = read_reminder(Locale::En, &ids(&["U1", "U3"]), "eyes");
        assert_eq!(text, "<@U1> <@U3>\nPlease react with :eyes:!");
        assert!(!text.contains("<@U2>"));
    }

    #[test]
    fn test_fully_acknowledged_has_no_mentions() {
        assert_eq!(read_reminder(Locale::En, &[], "eyes"), "Everyone has reacted!");
        assert_eq!(
            any_reminder(Locale::Ja, &[], &["one".to_string()]),
            "全メンバーのリアクションが完了しています！"
        );
    }

    #[test]
    fn test_japanese_templates() {
        assert_eq!(
            read_reminder(Locale::Ja, &ids(&["U1"]), "eyes"),
            "<@U1>\nリアクション :eyes: をお願いします！"
        );
        assert_eq!(
            any_reminder(
                Locale::Ja,
                &ids(&["U1", "U2"]),
                &["one".to_string(), "two".to_string()]
            ),
            "<@U1> <@U2>\nリアクション（ :one: or :two: ）をお願いします！"
        );
    }

    #[test]
    fn test_any_reminder_single_candidate() {
        assert_eq!(
            any_reminder(Locale::En, &ids(&["U1"]), &["thumbsup".to_string()]),
            "<@U1>\nPlease react with ( :thumbsup: )!"
        );
    }
}
