//! Prompt builders for the three LLM providers
//!
//! Pure functions: document + options in, `{system, user}` strings out.
//! No I/O, no panics. Every builder that expects structured output
//! instructs the model to mirror the document's own field names and add a
//! `changes_summary` string, so the extractor and merge layer can stay
//! schema-free.
//!
//! Quiz inclusion is a builder-level decision (`QuizMode`), not a
//! runtime mutation of a schema object.

use cforge_common::models::{ContentDocument, ContentKind};
use serde::{Deserialize, Serialize};

use crate::refine::RefineOptions;

/// System + user prompt pair for one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Whether generated course sections carry quiz questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
    WithQuiz,
    WithoutQuiz,
}

/// Requested content length band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLength {
    Short,
    Medium,
    Long,
}

/// Summary detail level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    Brief,
    Detailed,
}

/// Free-text editor action (from the content editor surface)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Summarize,
    Improve,
    Expand,
    Simplify,
    Rewrite,
    Translate,
}

/// Inputs for initial book/course generation
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSpec {
    pub kind: ContentKind,
    pub topic: String,
    pub title: Option<String>,
    pub level: String,
    pub unique_twist: Option<String>,
    pub audience: Option<String>,
    pub target_length: Option<TargetLength>,
    pub quiz_mode: Option<QuizMode>,
    pub language: Option<String>,
    #[serde(default)]
    pub adult_content: bool,
    #[serde(default)]
    pub british_humor: bool,
}

// ============================================================================
// Refinement
// ============================================================================

/// Build the per-iteration refinement prompt pair
///
/// Iteration focus:
/// - 1: grammar, spelling, structural corrections
/// - 2: tone consistency, audience adaptation, factual depth
/// - 3+: creative polish plus a self-reported originality estimate
pub fn refinement_prompts(
    doc: &ContentDocument,
    iteration: u32,
    total: u32,
    opts: &RefineOptions,
) -> PromptPair {
    let kind = doc.kind();

    let mut system = format!(
        "You are an expert educational content editor and refinement specialist. \
         You're working on iteration {} of {} to perfect this {}.\n\nYour goals for this iteration:\n",
        iteration, total, kind
    );
    match &opts.goals {
        Some(goals) if !goals.trim().is_empty() => {
            system.push_str(&format!("- {}\n", goals));
        }
        _ => system.push_str("- Improve overall quality, clarity, and engagement\n"),
    }
    if let Some(audience) = opts.audience.as_deref().filter(|a| !a.trim().is_empty()) {
        system.push_str(&format!("- Target audience: {}\n", audience));
    }
    if let Some(tone) = opts.tone.as_deref().filter(|t| !t.trim().is_empty()) {
        system.push_str(&format!("- Tone: {}\n", tone));
    }

    system.push_str("\nFocus areas:\n");
    match iteration {
        1 => system.push_str(
            "- Grammar, spelling, and basic corrections\n- Structural improvements and flow\n",
        ),
        2 => system.push_str(
            "- Tone consistency and audience adaptation\n- Factual accuracy and depth enhancement\n",
        ),
        _ => system.push_str(
            "- Creative enhancements and memorable elements\n\
             - Final polish and perfection\n\
             - Report an originality estimate (percentage) in changes_summary\n",
        ),
    }

    system.push_str(
        "\nReturn a JSON object with the refined content in the exact same structure as \
         the input, plus a \"changes_summary\" field explaining what you improved.",
    );

    let user = match doc {
        ContentDocument::Book(book) => {
            let chapters_json = serde_json::to_string_pretty(&book.chapters)
                .unwrap_or_else(|_| "[]".to_string());
            format!(
                "Refine this book:\n\n\
                 Title: {}\n\
                 Subtitle: {}\n\
                 Level: {}\n\
                 Topic: {}\n\n\
                 Chapters: {}\n\n\
                 Return JSON with:\n\
                 {{\n\
                 \x20   \"title\": \"refined title\",\n\
                 \x20   \"subtitle\": \"refined subtitle\",\n\
                 \x20   \"chapters\": [refined chapters array],\n\
                 \x20   \"changes_summary\": \"explanation of improvements made\"\n\
                 }}",
                book.title,
                book.subtitle.as_deref().unwrap_or(""),
                book.level,
                book.topic,
                chapters_json,
            )
        }
        ContentDocument::Course(course) => {
            let modules_json = serde_json::to_string_pretty(&course.content_structure)
                .unwrap_or_else(|_| "[]".to_string());
            format!(
                "Refine this course:\n\n\
                 Title: {}\n\
                 Description: {}\n\
                 Level: {}\n\
                 Topic: {}\n\n\
                 Modules: {}\n\n\
                 Return JSON with:\n\
                 {{\n\
                 \x20   \"title\": \"refined title\",\n\
                 \x20   \"description\": \"refined description\",\n\
                 \x20   \"content_structure\": [refined modules array],\n\
                 \x20   \"changes_summary\": \"explanation of improvements made\"\n\
                 }}",
                course.title,
                course.description.as_deref().unwrap_or(""),
                course.level,
                course.topic,
                modules_json,
            )
        }
    };

    PromptPair { system, user }
}

/// Trends lookup prompt for a refinement iteration
///
/// Iteration 1 asks for real-time context around the topic; later
/// iterations ask for creative injection. Both request a JSON reply.
pub fn trends_prompts(topic: &str, kind: ContentKind, iteration: u32, audience: &str) -> PromptPair {
    if iteration <= 1 {
        PromptPair {
            system: String::new(),
            user: format!(
                "Analyze this {} topic: \"{}\"\n\n\
                 Provide:\n\
                 1. Current trends and real-time data related to this topic\n\
                 2. Recent developments or news (last 6 months)\n\
                 3. Popular discussions or controversies\n\
                 4. Relevant statistics or data points\n\
                 5. Sources for all information (URLs if available)\n\n\
                 Return as JSON:\n\
                 {{\n\
                 \x20   \"trends\": [\"trend1\", \"trend2\"],\n\
                 \x20   \"recent_developments\": [\"dev1\", \"dev2\"],\n\
                 \x20   \"statistics\": [{{\"stat\": \"description\", \"source\": \"url\"}}],\n\
                 \x20   \"discussions\": \"summary\",\n\
                 \x20   \"sources\": [\"url1\", \"url2\"]\n\
                 }}",
                kind, topic
            ),
        }
    } else {
        PromptPair {
            system: String::new(),
            user: format!(
                "Add creative flair to this {} on \"{}\" for {}:\n\n\
                 Suggest:\n\
                 1. 3 memorable metaphors or analogies\n\
                 2. 2 witty hooks or taglines\n\
                 3. Real-world examples from current events\n\
                 4. Engaging storytelling elements\n\n\
                 Keep it appropriate for {}.\n\n\
                 Return as JSON:\n\
                 {{\"creative_suggestions\": [\"suggestion1\", \"suggestion2\"]}}",
                kind, topic, audience, audience
            ),
        }
    }
}

/// Research lookup prompt (cited background for a topic)
pub fn research_prompts(query: &str) -> PromptPair {
    PromptPair {
        system: "You are a research assistant providing accurate, well-cited information. \
                 Always include sources and verify facts."
            .to_string(),
        user: query.to_string(),
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Build the initial-generation prompt pair for a book or course
pub fn generation_prompts(spec: &GenerationSpec) -> PromptPair {
    let language = spec.language.as_deref().unwrap_or("en-US");
    let language_name = match language {
        "en-US" => "US English",
        "en-GB" => "UK English",
        other => other,
    };

    let humor_instruction = if spec.british_humor {
        "\n\nSTYLE: Use British humor - dry wit, cheeky asides, and irreverent references \
         where appropriate. Make it witty without losing educational value."
    } else {
        ""
    };
    let content_instruction = if spec.adult_content {
        "\n\nCONTENT RATING: This is adult content (18+). You may include mature themes, \
         explicit language, and adult humor."
    } else {
        "\n\nCONTENT RATING: Keep content appropriate for general audiences."
    };

    let system = match spec.kind {
        ContentKind::Course => format!(
            "You are an expert educational content creator. Create comprehensive, engaging \
             course content in {}.{}{} Return ONLY valid JSON, no other text.",
            language_name, humor_instruction, content_instruction
        ),
        ContentKind::Book => format!(
            "You are an expert author. Create compelling book content in {}.{}{} \
             Return ONLY valid JSON, no other text.",
            language_name, humor_instruction, content_instruction
        ),
    };

    let length = spec.target_length.unwrap_or(TargetLength::Medium);
    let user = match spec.kind {
        ContentKind::Course => {
            let module_count = match length {
                TargetLength::Short => "3-4 modules",
                TargetLength::Medium => "5-6 modules",
                TargetLength::Long => "8-10 modules",
            };
            let quiz_line = match spec.quiz_mode.unwrap_or(QuizMode::WithoutQuiz) {
                QuizMode::WithQuiz => {
                    ",\n                    \"quiz_questions\": [{\"question\": \"...\", \
                     \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correct_answer\": 0}]"
                }
                QuizMode::WithoutQuiz => "",
            };
            format!(
                "Create a {}-level course on \"{}\" in {}.\n\n\
                 Title: {}\n\
                 Unique angle: {}\n\
                 Audience: {}\n\
                 Length: {}\n\n\
                 Return JSON:\n\
                 {{\n\
                 \x20   \"title\": \"Course title\",\n\
                 \x20   \"description\": \"Course description (100-150 words)\",\n\
                 \x20   \"content_structure\": [\n\
                 \x20       {{\n\
                 \x20           \"module_title\": \"Module name\",\n\
                 \x20           \"sections\": [\n\
                 \x20               {{\n\
                 \x20                   \"title\": \"Section title\",\n\
                 \x20                   \"content\": \"Detailed markdown content (300-500 words)\",\n\
                 \x20                   \"key_points\": [\"point 1\", \"point 2\", \"point 3\"]{}\n\
                 \x20               }}\n\
                 \x20           ]\n\
                 \x20       }}\n\
                 \x20   ]\n\
                 }}",
                spec.level,
                spec.topic,
                language_name,
                spec.title.as_deref().unwrap_or(&spec.topic),
                spec.unique_twist.as_deref().unwrap_or("engaging and practical"),
                spec.audience.as_deref().unwrap_or("general learners"),
                module_count,
                quiz_line,
            )
        }
        ContentKind::Book => {
            let chapter_count = match length {
                TargetLength::Short => "6-8 chapters",
                TargetLength::Medium => "10-12 chapters",
                TargetLength::Long => "15-20 chapters",
            };
            format!(
                "Write a {}-level book on \"{}\" in {}.\n\n\
                 Title: {}\n\
                 Perspective: {}\n\
                 Length: {}\n\n\
                 Return JSON:\n\
                 {{\n\
                 \x20   \"title\": \"Book title\",\n\
                 \x20   \"subtitle\": \"Compelling subtitle\",\n\
                 \x20   \"chapters\": [\n\
                 \x20       {{\n\
                 \x20           \"chapter_number\": 1,\n\
                 \x20           \"title\": \"Chapter title\",\n\
                 \x20           \"content\": \"Full chapter in markdown (1000-2000 words)\",\n\
                 \x20           \"key_takeaways\": [\"takeaway 1\", \"takeaway 2\", \"takeaway 3\"]\n\
                 \x20       }}\n\
                 \x20   ]\n\
                 }}",
                spec.level,
                spec.topic,
                language_name,
                spec.title.as_deref().unwrap_or(&spec.topic),
                spec.unique_twist.as_deref().unwrap_or("fresh and engaging"),
                chapter_count,
            )
        }
    };

    PromptPair { system, user }
}

// ============================================================================
// Brainstorm / summarize / edit / recommendations
// ============================================================================

/// Brainstorm prompt for the trends provider
pub fn brainstorm_prompts(
    topic: &str,
    kind: Option<ContentKind>,
    level: Option<&str>,
    current_angles: Option<&str>,
    include_real_time: bool,
) -> PromptPair {
    let system = "You are CreativeSpark, a witty AI brainstorming assistant. You specialize \
                  in generating unique, engaging angles for educational content. Be creative, \
                  bold, and inject personality while maintaining educational value."
        .to_string();

    let kind_label = kind.map(|k| k.to_string()).unwrap_or_else(|| "content".into());
    let mut user = format!(
        "Brainstorm creative angles for a {} on \"{}\" at {} level.\n\n",
        kind_label,
        topic,
        level.unwrap_or("any"),
    );
    if let Some(angles) = current_angles.filter(|a| !a.trim().is_empty()) {
        user.push_str(&format!("Current ideas to build upon: {}\n\n", angles));
    }
    user.push_str(
        "Generate:\n\
         1. **5 Unique Angles**: Unconventional approaches, creative metaphors, or unexpected connections\n\
         2. **Witty Hooks**: Attention-grabbing opening lines or taglines\n\
         3. **Creative Formats**: Innovative ways to present the content (storytelling, gamification, etc.)\n\
         4. **Engagement Ideas**: Interactive elements, challenges, or viral-worthy concepts\n",
    );
    if include_real_time {
        user.push_str(
            "5. **Real-Time Context**: Current trends, news, or cultural references related to this topic\n",
        );
    }
    user.push_str(
        "\nBe specific, actionable, and inject personality. Make learning unforgettable!\n\n\
         Return as JSON:\n\
         {\n\
         \x20   \"unique_angles\": [{\"angle\": \"description\", \"why_it_works\": \"reason\"}],\n\
         \x20   \"witty_hooks\": [\"hook1\", \"hook2\", \"hook3\"],\n\
         \x20   \"creative_formats\": [{\"format\": \"name\", \"description\": \"how it works\"}],\n\
         \x20   \"engagement_ideas\": [{\"idea\": \"concept\", \"implementation\": \"how to do it\"}],\n\
         \x20   \"real_time_context\": {\"trends\": [\"trend1\"], \"cultural_references\": [\"ref1\"], \
         \"current_discussions\": \"summary\"}\n\
         }",
    );

    PromptPair { system, user }
}

/// Summary prompt for a stored document
pub fn summary_prompts(doc: &ContentDocument, summary_type: SummaryType) -> PromptPair {
    let overview = match summary_type {
        SummaryType::Brief => "2-3 sentence overview",
        SummaryType::Detailed => "Detailed multi-paragraph summary",
    };

    let user = match doc {
        ContentDocument::Book(book) => format!(
            "Summarize this book:\n\n\
             Title: {}\n\
             Topic: {}\n\
             Level: {}\n\
             Chapters: {}\n\n\
             Provide:\n\
             1. {}\n\
             2. Key learning outcomes (3-5 points)\n\
             3. Target audience\n\
             4. Estimated reading time\n\n\
             Return as JSON.",
            book.title,
            book.topic,
            book.level,
            book.chapters.len(),
            overview,
        ),
        ContentDocument::Course(course) => format!(
            "Summarize this course:\n\n\
             Title: {}\n\
             Topic: {}\n\
             Modules: {}\n\n\
             Provide:\n\
             1. {}\n\
             2. Learning objectives (3-5 points)\n\
             3. Skills gained\n\
             4. Who should take this\n\n\
             Return as JSON.",
            course.title,
            course.topic,
            course.content_structure.len(),
            overview,
        ),
    };

    PromptPair {
        system: String::new(),
        user,
    }
}

/// Editor-action prompt over free-text content
pub fn edit_prompts(
    action: EditAction,
    content: &str,
    content_type: &str,
    instructions: Option<&str>,
) -> PromptPair {
    let instructions = instructions.filter(|i| !i.trim().is_empty());
    let (system, user) = match action {
        EditAction::Summarize => (
            "You are an expert content summarizer. Create concise, insightful summaries.",
            format!(
                "Summarize this {}:\n\n{}\n\n\
                 Provide:\n1. Brief summary (2-3 sentences)\n2. Key points (3-5 bullet points)\n\
                 3. Main takeaway\n\n\
                 Return JSON: {{\"summary\": \"...\", \"key_points\": [\"...\"], \"main_takeaway\": \"...\"}}",
                content_type, content
            ),
        ),
        EditAction::Improve => (
            "You are an expert editor. Improve clarity, flow, and engagement while \
             maintaining the original meaning.",
            format!(
                "Improve this {}:\n\n{}\n\n{}\n\nReturn the improved version as plain text.",
                content_type,
                content,
                instructions
                    .map(|i| format!("Focus on: {}", i))
                    .unwrap_or_else(|| {
                        "Enhance clarity, engagement, and professionalism.".to_string()
                    }),
            ),
        ),
        EditAction::Expand => (
            "You are an expert content writer. Expand content with relevant details, \
             examples, and insights.",
            format!(
                "Expand this {}:\n\n{}\n\n{}\n\nReturn the expanded version as markdown.",
                content_type,
                content,
                instructions
                    .map(|i| format!("Guidelines: {}", i))
                    .unwrap_or_else(|| "Add depth, examples, and detailed explanations.".to_string()),
            ),
        ),
        EditAction::Simplify => (
            "You are an expert at making complex content accessible. Simplify without \
             losing essential information.",
            format!(
                "Simplify this {} for easier understanding:\n\n{}\n\n{}\n\n\
                 Return the simplified version as markdown.",
                content_type,
                content,
                instructions
                    .map(|i| format!("Target audience: {}", i))
                    .unwrap_or_else(|| "Make it clear and accessible.".to_string()),
            ),
        ),
        EditAction::Rewrite => (
            "You are an expert content rewriter. Transform content while preserving core \
             information.",
            format!(
                "Rewrite this {}:\n\n{}\n\n{}\n\nReturn the rewritten version as markdown.",
                content_type,
                content,
                instructions
                    .map(|i| format!("Style: {}", i))
                    .unwrap_or_else(|| "Make it fresh and engaging.".to_string()),
            ),
        ),
        EditAction::Translate => (
            "You are an expert translator. Provide accurate, natural translations.",
            format!(
                "Translate this {}:\n\n{}\n\nTarget language: {}\n\nReturn the translated version.",
                content_type,
                content,
                instructions.unwrap_or("Spanish"),
            ),
        ),
    };

    PromptPair {
        system: system.to_string(),
        user,
    }
}

/// Recommendations prompt built from a user's authored-content profile
pub fn recommendation_prompts(
    topics: &[String],
    levels: &[String],
    course_count: usize,
    book_count: usize,
) -> PromptPair {
    PromptPair {
        system: String::new(),
        user: format!(
            "Analyze this user's learning profile and recommend 5 new topics/courses:\n\n\
             Created Content:\n\
             - Topics: {}\n\
             - Levels: {}\n\
             - Total created: {} courses, {} books\n\n\
             Provide recommendations that:\n\
             1. Build on existing interests\n\
             2. Introduce complementary skills\n\
             3. Progress to next difficulty level\n\
             4. Include trending/relevant topics\n\
             5. Mix theoretical and practical content\n\n\
             Return JSON:\n\
             {{\n\
             \x20   \"recommendations\": [\n\
             \x20       {{\n\
             \x20           \"title\": \"suggested title\",\n\
             \x20           \"topic\": \"topic area\",\n\
             \x20           \"reason\": \"why this fits the user\",\n\
             \x20           \"level\": \"beginner/intermediate/advanced/phd\",\n\
             \x20           \"type\": \"course or book\",\n\
             \x20           \"trending\": true\n\
             \x20       }}\n\
             \x20   ],\n\
             \x20   \"learning_path_insights\": \"personalized insights about their learning journey\",\n\
             \x20   \"skill_gaps\": [\"gap1\", \"gap2\"]\n\
             }}",
            topics.join(", "),
            levels.join(", "),
            course_count,
            book_count,
        ),
    }
}
