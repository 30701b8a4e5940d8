use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Personal details used to fill contact fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// Home city; empty means "use the listing's location".
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub linkedin_url: String,
    #[serde(default)]
    pub website: String,
    /// Short professional summary, also given to the AI as context.
    #[serde(default)]
    pub summary: String,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// The `[answers]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Re-resolve questions that already have a cached answer.
    #[serde(default)]
    pub overwrite_previous_answers: bool,

    /// AI-generated cache entries older than this are re-resolved.
    #[serde(default = "default_ai_answer_max_age_days")]
    pub ai_answer_max_age_days: u32,

    #[serde(default)]
    pub profile: Profile,

    /// Total years of professional experience.
    #[serde(default)]
    pub years_of_experience: Option<u32>,

    /// Years per skill, matched against "years of experience with X" questions.
    #[serde(default)]
    pub skills: BTreeMap<String, u32>,

    /// Expected yearly salary, in whole currency units.
    #[serde(default)]
    pub desired_salary: Option<u64>,

    /// Current yearly compensation, in whole currency units.
    #[serde(default)]
    pub current_salary: Option<u64>,

    #[serde(default)]
    pub notice_period_days: Option<u32>,

    #[serde(default)]
    pub requires_sponsorship: bool,

    #[serde(default = "default_true")]
    pub authorized_to_work: bool,

    #[serde(default)]
    pub cover_letter: String,

    /// Free-form answers keyed by a phrase the question must contain.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,

    /// Option picked for a select field no rule answers; tried before the AI.
    /// Unset means such fields go to the operator.
    #[serde(default)]
    pub default_option_index: Option<usize>,
}

fn default_ai_answer_max_age_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            overwrite_previous_answers: false,
            ai_answer_max_age_days: default_ai_answer_max_age_days(),
            profile: Profile::default(),
            years_of_experience: None,
            skills: BTreeMap::new(),
            desired_salary: None,
            current_salary: None,
            notice_period_days: None,
            requires_sponsorship: false,
            authorized_to_work: true,
            cover_letter: String::new(),
            custom: BTreeMap::new(),
            default_option_index: None,
        }
    }
}

impl AnswerConfig {
    /// Candidate description handed to the AI collaborator.
    pub fn profile_context(&self) -> String {
        let mut lines = Vec::new();
        let name = self.profile.full_name();
        if !name.is_empty() {
            lines.push(format!("Name: {}", name));
        }
        if !self.profile.city.is_empty() {
            lines.push(format!("City: {}", self.profile.city));
        }
        if let Some(years) = self.years_of_experience {
            lines.push(format!("Years of experience: {}", years));
        }
        if !self.skills.is_empty() {
            let skills: Vec<String> = self
                .skills
                .iter()
                .map(|(skill, years)| format!("{} ({}y)", skill, years))
                .collect();
            lines.push(format!("Skills: {}", skills.join(", ")));
        }
        if let Some(days) = self.notice_period_days {
            lines.push(format!("Notice period: {} days", days));
        }
        lines.push(format!(
            "Requires visa sponsorship: {}",
            if self.requires_sponsorship { "yes" } else { "no" }
        ));
        if !self.profile.summary.is_empty() {
            lines.push(format!("Summary: {}", self.profile.summary));
        }
        lines.join("\n")
    }
}
