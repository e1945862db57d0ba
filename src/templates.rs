//! Prompt templates for every stage.
//!
//! Placeholders use `{name}` and are filled by [`prompt::render`](crate::prompt::render)
//! from the task input. The expected JSON shape is appended by the task, so
//! templates only describe content.

/// Background information. Vars: `topic`.
pub const INFORMATION: &str = "\
You are an expert Computer Science educator writing study material.

Write in-depth background information, roughly 500 to 700 words, about the topic \"{topic}\".

Cover whichever of these apply:
- Core definitions of the key terms.
- Fundamental concepts and the ideas underneath them.
- Relevant algorithms or data structures: purpose, steps, time and space complexity.
- Key principles, rules and theories.
- Variations or types of the concept.
- Brief historical context.
- Practical applications and examples.
- Advantages, disadvantages and trade-offs.

Organize the text in well-structured, longer paragraphs. Markdown code blocks are allowed inside the text.
The material will be used to write easy, medium and hard quiz questions, so it must be accurate and detailed.

Put the whole text in the \"information\" field. If the topic is too obscure or ill-defined to explain meaningfully, set \"information\" to an empty string.";

/// Textual flowchart. Vars: `topic`, `information`.
pub const FLOWCHART: &str = "\
You summarize complex material as simple, sequential flowcharts.

From the background information about \"{topic}\" below, write a textual flowchart of the key steps, processes or concepts.

Use a plain format such as:
Start -> [Step A] -> [Step B] -> [Decision? Yes -> Step C, No -> Step D] -> End
or a numbered list of steps, one per line.

Keep it short and follow the main flow of the material. If the material has no sequential structure (purely descriptive, or a list of unrelated facts), set \"flowchart\" to an empty string.

Background information:
---
{information}
---";

/// Quiz. Vars: `topic`, `information`, `total`, `non_coding`, `easy`,
/// `medium`, `hard`, `coding`.
pub const QUIZ: &str = "\
You are an expert Computer Science quiz author.

Using the background information below, write exactly {total} questions about \"{topic}\".

Background information:
---
{information}
---

The quiz has two parts:
1. {non_coding} multiple-choice questions drawn from the background information, testing definitions, concepts, algorithms, principles, applications and trade-offs.
   Difficulty split: {easy} easy (recall and definitions), {medium} medium (comprehension and application), {hard} hard (analysis and comparison).
2. {coding} coding questions: practical problems, output prediction, bug finding or snippet completion, usually medium or hard.
   They are still multiple choice with four options. Set \"isCodingQuestion\" to true for these and only these.

Every question has:
- \"question\": the question text. Markdown code formatting is allowed.
- \"options\": exactly four choices labeled \"A\", \"B\", \"C\" and \"D\", none of them empty, exactly one correct.
- \"correct_answer\": the letter of the correct option.
- \"explanation\": one sentence on why the answer is right.
- \"difficulty\": one of \"easy\", \"medium\" or \"hard\".
- \"isCodingQuestion\": true for coding questions, false otherwise.

Reply with the JSON object only, no prose around it. If the information is insufficient for a quiz, reply with an empty \"quiz\" array.";

/// Core-topic extraction. Vars: `syllabus_text`, `past_exam_questions_text`.
pub const CORE_TOPICS: &str = "\
You are an expert curriculum analyst. Identify the most critical and most frequently examined core topics by combining the syllabus and the past exam questions below.

Syllabus:
---
{syllabus_text}
---

Past exam questions:
---
{past_exam_questions_text}
---

A core topic is central to the syllabus structure, emphasized or repeated in the syllabus, frequent in past exams, or a foundation other topics build on.

Put the core topics in \"coreTopicsText\" as a numbered list.";

/// Syllabus exam questions. Vars: `syllabus_text`, `syllabus_flowchart`,
/// `core_topics_flowchart`, `past_exam_questions_text`, `target_count`.
pub const SYLLABUS_QUESTIONS: &str = "\
You are an expert Computer Science examination author. Write EXACTLY {target_count} unique exam questions.

Syllabus:
---
{syllabus_text}
---

Overall syllabus flowchart:
---
{syllabus_flowchart}
---

Core topics flowchart:
---
{core_topics_flowchart}
---

Past exam questions (reference for style, emphasis and mark complexity):
---
{past_exam_questions_text}
---

Requirements:
1. Exactly {target_count} questions, no more and no fewer.
2. Cover the syllabus broadly, guided by both flowcharts.
3. Each question carries one of these marks: 1, 2.5, 5 or 12.5.
4. Mix the marks: roughly 30-40% at 1 mark, 30-40% at 2.5, 15-20% at 5 and 5-10% at 12.5.
5. Match complexity to marks: 1 for recall, 2.5 for applying one concept, 5 for comparisons or multi-concept explanations, 12.5 for design, in-depth analysis or substantial coding.
6. Follow the style and question types of the past exam questions.
7. Every question is unique.

Reply ONLY with a JSON array. Each element has exactly two fields: \"questionText\" (string) and \"marks\" (number).";
