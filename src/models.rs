use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExperienceLevel {
    #[default]
    Fresher,
    Junior,
    MidLevel,
    Senior,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 4] = [
        ExperienceLevel::Fresher,
        ExperienceLevel::Junior,
        ExperienceLevel::MidLevel,
        ExperienceLevel::Senior,
    ];

    /// The label sent to the analysis service, unmodified.
    pub fn label(self) -> &'static str {
        match self {
            ExperienceLevel::Fresher => "Fresher (0–1 year)",
            ExperienceLevel::Junior => "Junior (1–3 years)",
            ExperienceLevel::MidLevel => "Mid-Level (3–6 years)",
            ExperienceLevel::Senior => "Senior (6+ years)",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            ExperienceLevel::Fresher => "fresher",
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::MidLevel => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::str::FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| {
                level.short_name().eq_ignore_ascii_case(needle) || level.label() == needle
            })
            .or(match needle.to_lowercase().as_str() {
                "mid-level" | "midlevel" => Some(ExperienceLevel::MidLevel),
                _ => None,
            })
            .ok_or_else(|| {
                format!(
                    "Unknown experience level '{}'. Available: fresher, junior, mid, senior",
                    s
                )
            })
    }
}

impl std::fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRole {
    pub id: &'static str,
    pub title: &'static str,
}

pub const ROLES: [JobRole; 12] = [
    JobRole { id: "swe", title: "Software Engineer" },
    JobRole { id: "da", title: "Data Analyst" },
    JobRole { id: "ds", title: "Data Scientist" },
    JobRole { id: "frontend", title: "Frontend Developer" },
    JobRole { id: "backend", title: "Backend Developer" },
    JobRole { id: "fullstack", title: "Full Stack Developer" },
    JobRole { id: "devops", title: "DevOps Engineer" },
    JobRole { id: "ai_ml", title: "AI / ML Engineer" },
    JobRole { id: "cloud", title: "Cloud Engineer" },
    JobRole { id: "cyber", title: "Cybersecurity Analyst" },
    JobRole { id: "pm", title: "Product Manager" },
    JobRole { id: "ux", title: "UI/UX Designer" },
];

/// Employers the service is asked to predict matches against.
pub const TOP_COMPANIES: [&str; 12] = [
    "Google", "Amazon", "Microsoft", "Meta", "Apple", "Netflix",
    "Infosys", "Accenture", "Deloitte", "TCS", "IBM", "Adobe",
];

/// Finds a catalog role by id or case-insensitive title.
pub fn find_role(name: &str) -> Option<usize> {
    let name = name.trim();
    ROLES
        .iter()
        .position(|r| r.id.eq_ignore_ascii_case(name) || r.title.eq_ignore_ascii_case(name))
}

// --- Response payload ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    pub ats_score: f64,
    pub readiness_level: String,
    pub shortlist_probability: String,
    pub breakdown: ScoreBreakdown,
    pub company_matches: Vec<CompanyMatch>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub summary_suggestion: SummarySuggestion,
    pub skill_optimization: Vec<SkillCategory>,
    pub experience_upgrades: Vec<ExperienceUpgrade>,
    pub future_skills: Vec<String>,
    pub rejection_risks: Vec<String>,
}

impl ResumeAnalysis {
    pub fn readiness(&self) -> Option<Readiness> {
        Readiness::from_label(&self.readiness_level)
    }

    pub fn probability(&self) -> Option<ShortlistProbability> {
        ShortlistProbability::from_label(&self.shortlist_probability)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub keyword_match: f64,
    pub skills_relevance: f64,
    pub experience_alignment: f64,
    pub project_impact: f64,
    pub structure_formatting: f64,
    pub grammar_tone: f64,
}

impl ScoreBreakdown {
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("Keyword Match", self.keyword_match),
            ("Skills Relevance", self.skills_relevance),
            ("Experience Alignment", self.experience_alignment),
            ("Project Impact", self.project_impact),
            ("Structure Formatting", self.structure_formatting),
            ("Grammar Tone", self.grammar_tone),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMatch {
    pub name: String,
    pub match_percentage: f64,
    pub status: String,
    pub reason: String,
}

impl CompanyMatch {
    pub fn match_status(&self) -> Option<MatchStatus> {
        MatchStatus::from_label(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySuggestion {
    pub current: String,
    pub optimized: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub category: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceUpgrade {
    pub original: String,
    pub upgraded: String,
    pub impact_description: String,
}

// --- Typed views over the service's labels (styling only) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Beginner,
    IndustryReady,
    FaangReady,
}

impl Readiness {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Beginner" => Some(Readiness::Beginner),
            "Industry Ready" => Some(Readiness::IndustryReady),
            "FAANG Ready" => Some(Readiness::FaangReady),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortlistProbability {
    Low,
    Medium,
    High,
    Exceptional,
}

impl ShortlistProbability {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "LOW" => Some(ShortlistProbability::Low),
            "MEDIUM" => Some(ShortlistProbability::Medium),
            "HIGH" => Some(ShortlistProbability::High),
            "EXCEPTIONAL" => Some(ShortlistProbability::Exceptional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    StrongMatch,
    Shortlist,
    Borderline,
    NeedsImprovement,
}

impl MatchStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Strong Match" => Some(MatchStatus::StrongMatch),
            "Shortlist" => Some(MatchStatus::Shortlist),
            "Borderline" => Some(MatchStatus::Borderline),
            "Needs Improvement" => Some(MatchStatus::NeedsImprovement),
            _ => None,
        }
    }
}

/// Formats a score without a trailing `.0` when it is integral.
pub fn format_score(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
pub(crate) fn sample_analysis() -> ResumeAnalysis {
    serde_json::from_str(SAMPLE_ANALYSIS_JSON).unwrap()
}

#[cfg(test)]
pub(crate) const SAMPLE_ANALYSIS_JSON: &str = r#"{
  "atsScore": 78,
  "readinessLevel": "Industry Ready",
  "shortlistProbability": "HIGH",
  "breakdown": {
    "keywordMatch": 72,
    "skillsRelevance": 80,
    "experienceAlignment": 85,
    "projectImpact": 64,
    "structureFormatting": 90,
    "grammarTone": 88
  },
  "companyMatches": [
    {"name": "Netflix", "matchPercentage": 58, "status": "Needs Improvement", "reason": "Limited streaming scale."},
    {"name": "Google", "matchPercentage": 82, "status": "Strong Match", "reason": "Strong Go and Kubernetes depth."},
    {"name": "Amazon", "matchPercentage": 74, "status": "Shortlist", "reason": "Good ownership signals."}
  ],
  "strengths": ["Kubernetes operations", "Go services"],
  "weaknesses": ["Few quantified results"],
  "summarySuggestion": {
    "current": "Backend developer with Go experience.",
    "optimized": "Senior backend engineer shipping Go services on Kubernetes at scale."
  },
  "skillOptimization": [
    {"category": "Languages", "skills": ["Go", "Rust"]},
    {"category": "Platforms", "skills": ["Kubernetes", "AWS"]}
  ],
  "experienceUpgrades": [
    {"original": "Worked on APIs", "upgraded": "Built 12 gRPC APIs serving 40k rps", "impactDescription": "Adds scale"}
  ],
  "futureSkills": ["eBPF", "Service mesh"],
  "rejectionRisks": ["No metrics", "Generic summary"]
}"#;
