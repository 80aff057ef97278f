// Audit scoring prompt templates. All scoring prompts live here.

use crate::models::record::JobContext;

pub const AUDIT_SYSTEM: &str = "\
You are an expert in ATS (Applicant Tracking Systems) and resume review. \
You MUST respond with valid JSON only — no markdown fences, no explanations. \
Be thorough and honest: a low score is fine if the resume deserves it.";

const AUDIT_INSTRUCTIONS: &str = r#"Analyze and rate the resume below and suggest how to improve it.
The rating can be low if the resume is bad.

If there is a job in context, rate the resume against that job:
COMPANY: {company_name}
JOB TITLE: {job_title}
JOB DESCRIPTION:
{job_description}

OUTPUT SCHEMA (return exactly this structure):
{
  "overallScore": number (0-100),
  "ATS": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": "string (short headline)"}]},
  "toneAndStyle": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": "string", "explanation": "string (detailed)"}]},
  "content": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": "string", "explanation": "string"}]},
  "structure": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": "string", "explanation": "string"}]},
  "skills": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": "string", "explanation": "string"}]}
}

RULES:
1. Give 3-4 tips per category.
2. Every score must be a number between 0 and 100.
3. Return ONLY the JSON object — nothing else, no code fences."#;

/// Renders the full audit instruction text for a job context.
pub fn audit_instructions(ctx: &JobContext) -> String {
    AUDIT_INSTRUCTIONS
        .replace("{company_name}", ctx.company_name.as_deref().unwrap_or("(not specified)"))
        .replace("{job_title}", ctx.job_title.as_deref().unwrap_or("(not specified)"))
        .replace("{job_description}", &ctx.job_description)
}
