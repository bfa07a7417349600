use crate::provider::ReviewRequest;

pub const SYSTEM_PROMPT: &str = "You are a senior code reviewer.\n\
\n\
Return STRICT JSON only using this schema:\n\
{\n\
  \"issues\": [\n\
    {\n\
      \"line\": 12,\n\
      \"severity\": \"critical|high|medium|low\",\n\
      \"title\": \"short description\",\n\
      \"suggestion\": \"how to fix\"\n\
    }\n\
  ]\n\
}\n\
\n\
No markdown.\n\
No prose.\n";

pub fn build_user_prompt(request: &ReviewRequest) -> String {
    format!(
        "File: {}\n\nChanges:\n{}\n\nProvide a concise but deep review.",
        request.file, request.content
    )
}
