//! 提示词构建

use crate::models::Post;

/// 系统消息
pub const SYSTEM_MESSAGE: &str = "You are a careful reviewer of student reports about \
using large language models on homework. You always answer with a single JSON object.";

/// 根据帖子构建分析提示词
pub fn build_prompt(post: &Post) -> String {
    format!(
        r#"You are analyzing a student's report about using an LLM (Large Language Model) to solve homework problems.

Post Title: {title}
LLM Used: {llm}
Homework Number: {homework}

Post Content:
{content}

Please provide a detailed, structured analysis of this post. Focus on:
1. The LLM's performance (accuracy, one-shot capability, reasoning quality)
2. Strengths demonstrated by the LLM
3. Weaknesses or limitations observed
4. Notable behaviors or patterns
5. Quality of explanations and derivations
6. Any concerns or issues raised by the student

Format your response as a JSON object with the following structure:
{{
    "summary": "A brief 2-3 sentence summary of the overall assessment",
    "performance": {{
        "accuracy": "Assessment of correctness (e.g., 'High', 'Moderate', 'Low')",
        "one_shot_capability": "Whether the LLM solved problems on first attempt",
        "reasoning_quality": "Quality of the reasoning process (e.g., 'Excellent', 'Good', 'Needs Improvement')"
    }},
    "strengths": ["3-5 specific strengths observed"],
    "weaknesses": ["3-5 specific weaknesses or limitations"],
    "notable_behaviors": ["2-4 notable patterns, behaviors, or observations"],
    "detailed_analysis": "A more detailed paragraph covering key aspects of the LLM's performance"
}}

Be thorough, specific, and objective. Reference specific examples from the post when possible."#,
        title = post.title(),
        llm = post.llm_label(),
        homework = post.homework_label(),
        content = post.body(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_post_fields() {
        let post = Post::new(1, "HW4 with Gemini", "It got problem 2 wrong.")
            .with_llm("Gemini")
            .with_homework_number(4);

        let prompt = build_prompt(&post);

        assert!(prompt.contains("Post Title: HW4 with Gemini"));
        assert!(prompt.contains("LLM Used: Gemini"));
        assert!(prompt.contains("Homework Number: 4"));
        assert!(prompt.contains("It got problem 2 wrong."));
        assert!(prompt.contains("\"one_shot_capability\""));
    }

    #[test]
    fn test_prompt_prefers_document_over_content() {
        let post = Post::new(2, "t", "short content").with_document("the full document");

        let prompt = build_prompt(&post);

        assert!(prompt.contains("the full document"));
        assert!(!prompt.contains("short content"));
        assert!(prompt.contains("Homework Number: Unknown"));
    }
}
