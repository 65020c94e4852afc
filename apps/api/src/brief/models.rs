//! The brief and its sections.
//!
//! `BriefSection` is the single source for section headers: the prompt's output
//! format and the response parser both read them from here. Only the three
//! `REQUIRED` sections decide whether a brief is partial; the others are extras the
//! completion is asked for and that are kept when present.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefSection {
    RoleSummary,
    TopRequiredSkills,
    StrongOverlaps,
    SkillGaps,
    PredictedQuestions,
    TalkingPoints,
    UpskillingPlan,
}

impl BriefSection {
    /// Prompt order; also the order sections are rendered in.
    pub const ALL: [BriefSection; 7] = [
        BriefSection::RoleSummary,
        BriefSection::TopRequiredSkills,
        BriefSection::StrongOverlaps,
        BriefSection::SkillGaps,
        BriefSection::PredictedQuestions,
        BriefSection::TalkingPoints,
        BriefSection::UpskillingPlan,
    ];

    /// Sections whose absence makes a brief partial.
    pub const REQUIRED: [BriefSection; 3] = [
        BriefSection::SkillGaps,
        BriefSection::PredictedQuestions,
        BriefSection::TalkingPoints,
    ];

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    /// Free-text sections: unmarked lines are content, not noise.
    pub fn is_prose(&self) -> bool {
        matches!(self, BriefSection::RoleSummary)
    }

    /// Header the completion is instructed to emit, without the trailing colon.
    pub fn header(&self) -> &'static str {
        match self {
            BriefSection::RoleSummary => "ROLE SUMMARY",
            BriefSection::TopRequiredSkills => "TOP REQUIRED SKILLS",
            BriefSection::StrongOverlaps => "STRONG OVERLAPS",
            BriefSection::SkillGaps => "SKILL GAPS",
            BriefSection::PredictedQuestions => "PREDICTED QUESTIONS",
            BriefSection::TalkingPoints => "TALKING POINTS",
            BriefSection::UpskillingPlan => "QUICK UPSKILLING PLAN",
        }
    }

    /// What the section must contain, as told to the completion service.
    pub fn instruction(&self) -> &'static str {
        match self {
            BriefSection::RoleSummary => "2-3 sentences on what this role really needs",
            BriefSection::TopRequiredSkills => {
                "5-8 skills the role requires, most important first, as short labels"
            }
            BriefSection::StrongOverlaps => {
                "strengths from the CV, each mapped to the job description need it answers"
            }
            BriefSection::SkillGaps => {
                "requirements from the job description the CV does not evidence, \
                most interview-relevant first, each with a one-line way to address it"
            }
            BriefSection::PredictedQuestions => {
                "6-10 questions the interviewer is likely to ask this candidate, \
                mixing technical, hands-on and behavioral questions tied to the role"
            }
            BriefSection::TalkingPoints => {
                "5-8 high-impact points from the candidate's actual experience \
                that map to the role's needs"
            }
            BriefSection::UpskillingPlan => {
                "3-5 concrete mini-tasks of at most 2 hours each that cover the gaps \
                before the interview"
            }
        }
    }

    /// Additional spellings accepted by the parser, already in matching form
    /// (lowercase, alphanumerics separated by single spaces).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            BriefSection::RoleSummary => &["role summary", "summary", "role overview"],
            BriefSection::TopRequiredSkills => &[
                "top required skills",
                "required skills",
                "top skills",
                "key skills",
            ],
            BriefSection::StrongOverlaps => &[
                "strong overlaps",
                "overlaps",
                "strengths",
                "strong matches",
            ],
            BriefSection::SkillGaps => &[
                "skill gaps",
                "skills gaps",
                "skill gap",
                "gaps",
                "gaps and risks",
                "skill gaps and risks",
            ],
            BriefSection::PredictedQuestions => &[
                "predicted questions",
                "predicted interview questions",
                "likely questions",
                "likely interview questions",
                "interview questions",
                "questions",
            ],
            BriefSection::TalkingPoints => &[
                "talking points",
                "key talking points",
                "high impact talking points",
                "talking point",
            ],
            BriefSection::UpskillingPlan => &[
                "quick upskilling plan",
                "upskilling plan",
                "upskilling",
                "prep plan",
            ],
        }
    }

    /// Heading used in rendered Markdown.
    pub fn title(&self) -> &'static str {
        match self {
            BriefSection::RoleSummary => "Role Summary",
            BriefSection::TopRequiredSkills => "Top Required Skills",
            BriefSection::StrongOverlaps => "Strong Overlaps (CV to JD)",
            BriefSection::SkillGaps => "Skill Gaps",
            BriefSection::PredictedQuestions => "Likely Interview Questions",
            BriefSection::TalkingPoints => "Talking Points",
            BriefSection::UpskillingPlan => "Quick Upskilling Plan",
        }
    }
}

impl fmt::Display for BriefSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Structured interview-prep brief.
///
/// Item order is the order the completion emitted; it is never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brief {
    pub skill_gaps: Vec<String>,
    pub predicted_questions: Vec<String>,
    pub talking_points: Vec<String>,
    /// True when at least one required section could not be recovered.
    pub partial: bool,
    pub missing_sections: Vec<BriefSection>,
    #[serde(default)]
    pub role_summary: Vec<String>,
    #[serde(default)]
    pub top_required_skills: Vec<String>,
    #[serde(default)]
    pub strong_overlaps: Vec<String>,
    #[serde(default)]
    pub upskilling_plan: Vec<String>,
}

impl Brief {
    pub fn section(&self, section: BriefSection) -> &[String] {
        match section {
            BriefSection::RoleSummary => &self.role_summary,
            BriefSection::TopRequiredSkills => &self.top_required_skills,
            BriefSection::StrongOverlaps => &self.strong_overlaps,
            BriefSection::SkillGaps => &self.skill_gaps,
            BriefSection::PredictedQuestions => &self.predicted_questions,
            BriefSection::TalkingPoints => &self.talking_points,
            BriefSection::UpskillingPlan => &self.upskilling_plan,
        }
    }

    pub fn section_mut(&mut self, section: BriefSection) -> &mut Vec<String> {
        match section {
            BriefSection::RoleSummary => &mut self.role_summary,
            BriefSection::TopRequiredSkills => &mut self.top_required_skills,
            BriefSection::StrongOverlaps => &mut self.strong_overlaps,
            BriefSection::SkillGaps => &mut self.skill_gaps,
            BriefSection::PredictedQuestions => &mut self.predicted_questions,
            BriefSection::TalkingPoints => &mut self.talking_points,
            BriefSection::UpskillingPlan => &mut self.upskilling_plan,
        }
    }
}
