use serde::{Deserialize, Serialize};

/// Target role supplied with each upload. Lives for one request only.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub title: String,
    pub description: String,
}

/// Verdict on whether the résumé's section sequence suits an ATS parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionOrderCheck {
    pub ats_friendly: bool,
    pub notes: String,
}

/// The six-part analysis returned for one résumé.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    /// 0 – 100
    pub ats_score: u32,
    pub section_order: SectionOrderCheck,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub skills_to_learn: Vec<String>,
    pub job_profiles: Vec<String>,
}

impl ResumeAnalysis {
    /// Checks the score range and drops blank list entries.
    pub fn normalized(mut self) -> Result<Self, String> {
        if self.ats_score > 100 {
            return Err(format!("ats_score {} is outside 0-100", self.ats_score));
        }
        self.section_order.notes = self.section_order.notes.trim().to_string();
        for list in [
            &mut self.issues,
            &mut self.suggestions,
            &mut self.skills_to_learn,
            &mut self.job_profiles,
        ] {
            list.retain(|item| !item.trim().is_empty());
            for item in list.iter_mut() {
                *item = item.trim().to_string();
            }
        }
        Ok(self)
    }

    /// Label shown next to the score on the result page.
    pub fn score_label(&self) -> &'static str {
        match self.ats_score {
            85..=100 => "Excellent",
            70..=84 => "Good",
            50..=69 => "Fair",
            _ => "Needs work",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResumeAnalysis {
        ResumeAnalysis {
            ats_score: 64,
            section_order: SectionOrderCheck {
                ats_friendly: false,
                notes: "  Skills buried at the end  ".to_string(),
            },
            issues: vec!["Inconsistent dates".to_string(), "   ".to_string()],
            suggestions: vec![" Quantify impact ".to_string()],
            skills_to_learn: vec!["Kubernetes".to_string()],
            job_profiles: vec![],
        }
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_entries() {
        let analysis = sample().normalized().unwrap();
        assert_eq!(analysis.issues, vec!["Inconsistent dates"]);
        assert_eq!(analysis.suggestions, vec!["Quantify impact"]);
        assert_eq!(analysis.section_order.notes, "Skills buried at the end");
    }

    #[test]
    fn test_normalized_rejects_score_above_100() {
        let mut analysis = sample();
        analysis.ats_score = 140;
        let err = analysis.normalized().unwrap_err();
        assert!(err.contains("140"));
    }

    #[test]
    fn test_score_label_bands() {
        let mut analysis = sample();
        for (score, label) in [(100, "Excellent"), (70, "Good"), (50, "Fair"), (0, "Needs work")] {
            analysis.ats_score = score;
            assert_eq!(analysis.score_label(), label);
        }
    }
}
