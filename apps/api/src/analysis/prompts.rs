// Prompt constants for résumé analysis.
// Reuses the JSON-only fragment from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// Role line prepended to the shared JSON-only system fragment.
pub const ANALYSIS_ROLE: &str = "You are an expert career counselor and ATS (applicant tracking system) reviewer.";

pub fn analysis_system() -> String {
    format!("{ANALYSIS_ROLE} {JSON_ONLY_SYSTEM}")
}

/// Analysis prompt template.
/// Replace: {resume_text}, {job_title}, {job_desc}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the resume below against the target role.

Resume:
{resume_text}

Job Title: {job_title}
Job Description: {job_desc}

Return a JSON object with this EXACT schema (no extra fields):
{
  "ats_score": 72,
  "section_order": {
    "ats_friendly": true,
    "notes": "Contact, Summary, Experience, Education, Skills. Move Skills above Education."
  },
  "issues": ["Mistakes and formatting issues, one per entry"],
  "suggestions": ["Concrete suggestions to improve the resume, one per entry"],
  "skills_to_learn": ["Skills worth learning for this job"],
  "job_profiles": ["Job profiles this resume is suitable for"]
}

Rules:
1. `ats_score` is an integer from 0 to 100 rating ATS compatibility for this role
2. `section_order` judges whether the sequence of sections is ATS-friendly
3. Every list entry is a short plain-text sentence or phrase
4. If the resume text is empty or unreadable, say so in `issues` and score 0"#;

/// Fills the analysis template. The résumé goes in last so its text is never
/// scanned for placeholders.
pub fn build_analysis_prompt(resume_text: &str, job_title: &str, job_desc: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{job_title}", job_title)
        .replace("{job_desc}", job_desc)
        .replacen("{resume_text}", resume_text, 1)
}
