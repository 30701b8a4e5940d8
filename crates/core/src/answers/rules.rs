//! Deterministic answers derived from configuration.
//!
//! Rules only look at the question text (normalized) and produce a preferred
//! answer as plain text. Mapping that text onto offered options is the
//! engine's job.

use super::{normalize_question, AnswerConfig, Question};
use crate::search::JobListing;

/// Answer a question from configuration, if any rule applies.
pub fn answer_by_rule(
    question: &Question,
    listing: &JobListing,
    config: &AnswerConfig,
) -> Option<String> {
    let q = normalize_question(&question.text);
    if q.is_empty() {
        return None;
    }

    for (phrase, answer) in &config.custom {
        let phrase = normalize_question(phrase);
        if !phrase.is_empty() && q.contains(&phrase) {
            return Some(answer.clone());
        }
    }

    let has = |words: &[&str]| words.iter().any(|w| contains_word(&q, w));
    let yes_no = |value: bool| if value { "Yes" } else { "No" }.to_string();

    if has(&["acknowledge", "agree", "consent", "privacy policy", "terms"]) {
        return Some("Yes".to_string());
    }

    // A bare "visa" asks about current status, not sponsorship
    if has(&["sponsor", "sponsorship", "sponsored"]) {
        return Some(yes_no(config.requires_sponsorship));
    }

    if has(&["authorized", "authorised", "legally", "eligible to work", "right to work"]) {
        return Some(yes_no(config.authorized_to_work));
    }

    if has(&["notice", "notice period"]) {
        return config.notice_period_days.map(|days| notice_in_unit(&q, days));
    }

    if has(&["salary", "compensation", "ctc", "pay", "remuneration"]) {
        let yearly = if has(&["current", "present"]) {
            config.current_salary
        } else {
            config.desired_salary
        };
        return yearly.map(|amount| salary_in_unit(&q, amount));
    }

    if q.contains("how many years") || (has(&["years", "yrs"]) && has(&["experience", "exp"])) {
        if let Some(years) = skill_years(&q, config) {
            return Some(years.to_string());
        }
        return config.years_of_experience.map(|years| years.to_string());
    }

    if has(&["experience"]) && question.field_type.has_options() {
        if skill_years(&q, config).is_some_and(|years| years > 0) {
            return Some("Yes".to_string());
        }
    }

    if has(&["phone", "mobile"]) {
        return non_empty(&config.profile.phone);
    }

    if has(&["email"]) {
        return non_empty(&config.profile.email);
    }

    if has(&["linkedin"]) {
        return non_empty(&config.profile.linkedin_url);
    }

    if has(&["website", "portfolio", "github"]) {
        return non_empty(&config.profile.website);
    }

    if q.contains("first name") {
        return non_empty(&config.profile.first_name);
    }

    if q.contains("last name") || has(&["surname"]) {
        return non_empty(&config.profile.last_name);
    }

    if q.contains("full name") || q == "name" {
        return non_empty(&config.profile.full_name());
    }

    if has(&["city", "location"]) || q.contains("where are you based") {
        if !config.profile.city.is_empty() {
            return Some(config.profile.city.clone());
        }
        return non_empty(&listing.location);
    }

    if q.contains("cover letter") {
        return non_empty(&config.cover_letter);
    }

    None
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.contains(' ') {
        return haystack.contains(needle);
    }
    haystack.split(' ').any(|word| word == needle)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn skill_years(question: &str, config: &AnswerConfig) -> Option<u32> {
    config
        .skills
        .iter()
        .find(|(skill, _)| {
            let skill = normalize_question(skill);
            !skill.is_empty() && contains_word(question, &skill)
        })
        .map(|(_, years)| *years)
}

/// Express a notice period in the unit the question asks for.
fn notice_in_unit(question: &str, days: u32) -> String {
    if contains_word(question, "months") || contains_word(question, "month") {
        days.div_ceil(30).to_string()
    } else if contains_word(question, "weeks") || contains_word(question, "week") {
        days.div_ceil(7).to_string()
    } else {
        days.to_string()
    }
}

/// Express a yearly amount in the unit the question asks for.
fn salary_in_unit(question: &str, yearly: u64) -> String {
    let mut amount = yearly as f64;
    if contains_word(question, "month") || contains_word(question, "monthly") {
        amount /= 12.0;
    }
    if contains_word(question, "lakh") || contains_word(question, "lakhs") || contains_word(question, "lpa") {
        amount /= 100_000.0;
    } else if contains_word(question, "k") || contains_word(question, "thousands") {
        amount /= 1_000.0;
    }

    if amount.fract().abs() < f64::EPSILON {
        format!("{}", amount as u64)
    } else {
        format!("{:.2}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::{FieldType, Profile};
    use crate::testing::fixtures;

    fn config() -> AnswerConfig {
        AnswerConfig {
            profile: Profile {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: "+44 20 7946 0000".to_string(),
                ..Default::default()
            },
            years_of_experience: Some(6),
            skills: [("rust".to_string(), 4), ("kubernetes".to_string(), 2)]
                .into_iter()
                .collect(),
            desired_salary: Some(1_200_000),
            current_salary: Some(960_000),
            notice_period_days: Some(45),
            ..Default::default()
        }
    }

    fn ask(text: &str) -> Option<String> {
        ask_typed(text, FieldType::ShortText)
    }

    fn ask_typed(text: &str, field_type: FieldType) -> Option<String> {
        let question = Question::new(text, field_type);
        answer_by_rule(&question, &fixtures::listing("1", "Engineer", "Acme"), &config())
    }

    #[test]
    fn test_contact_fields() {
        assert_eq!(ask("First name").as_deref(), Some("Ada"));
        assert_eq!(ask("Mobile phone number").as_deref(), Some("+44 20 7946 0000"));
        assert_eq!(ask("Email address").as_deref(), Some("ada@example.com"));
        assert_eq!(ask("Full name").as_deref(), Some("Ada Lovelace"));
        assert_eq!(ask("LinkedIn profile"), None);
    }

    #[test]
    fn test_years_of_experience_prefers_skill() {
        assert_eq!(
            ask("How many years of work experience do you have with Rust?").as_deref(),
            Some("4")
        );
        assert_eq!(ask("Years of experience").as_deref(), Some("6"));
    }

    #[test]
    fn test_skill_yes_no() {
        assert_eq!(
            ask_typed("Do you have experience with Kubernetes?", FieldType::Radio).as_deref(),
            Some("Yes")
        );
        assert_eq!(
            ask_typed("Do you have experience with Erlang?", FieldType::Radio),
            None
        );
    }

    #[test]
    fn test_salary_units() {
        assert_eq!(ask("Expected salary").as_deref(), Some("1200000"));
        assert_eq!(ask("Current CTC in lakhs").as_deref(), Some("9.60"));
        assert_eq!(ask("Expected monthly salary").as_deref(), Some("100000"));
        assert_eq!(ask("Desired salary (k)").as_deref(), Some("1200"));
    }

    #[test]
    fn test_notice_period_units() {
        assert_eq!(ask("Notice period (days)").as_deref(), Some("45"));
        assert_eq!(ask("What is your notice period in months?").as_deref(), Some("2"));
        assert_eq!(ask("Notice period in weeks").as_deref(), Some("7"));
    }

    #[test]
    fn test_sponsorship_and_authorization() {
        assert_eq!(
            ask_typed("Will you now or in the future require visa sponsorship?", FieldType::Radio)
                .as_deref(),
            Some("No")
        );
        assert_eq!(
            ask_typed("Are you legally authorized to work in the EU?", FieldType::Radio).as_deref(),
            Some("Yes")
        );
    }

    #[test]
    fn test_visa_status_is_not_a_sponsorship_question() {
        let config = AnswerConfig {
            requires_sponsorship: true,
            ..config()
        };
        let listing = fixtures::listing("1", "Engineer", "Acme");

        let status = Question::new("Do you hold a valid visa?", FieldType::Radio);
        assert_eq!(answer_by_rule(&status, &listing, &config), None);

        let sponsorship = Question::new("Will you require visa sponsorship?", FieldType::Radio);
        assert_eq!(
            answer_by_rule(&sponsorship, &listing, &config).as_deref(),
            Some("Yes")
        );
    }

    #[test]
    fn test_city_falls_back_to_listing_location() {
        let mut listing = fixtures::listing("1", "Engineer", "Acme");
        listing.location = "Lisbon, Portugal".to_string();
        let question = Question::new("City", FieldType::ShortText);
        assert_eq!(
            answer_by_rule(&question, &listing, &config()).as_deref(),
            Some("Lisbon, Portugal")
        );
    }

    #[test]
    fn test_custom_answers_take_precedence() {
        let mut config = config();
        config
            .custom
            .insert("hear about us".to_string(), "LinkedIn".to_string());
        config
            .custom
            .insert("salary".to_string(), "Negotiable".to_string());
        let listing = fixtures::listing("1", "Engineer", "Acme");

        let q = Question::new("How did you hear about us?", FieldType::ShortText);
        assert_eq!(answer_by_rule(&q, &listing, &config).as_deref(), Some("LinkedIn"));

        let q = Question::new("Expected salary", FieldType::ShortText);
        assert_eq!(answer_by_rule(&q, &listing, &config).as_deref(), Some("Negotiable"));
    }

    #[test]
    fn test_unknown_question() {
        assert_eq!(ask_typed("Are you comfortable commuting?", FieldType::SingleSelect), None);
    }
}
