// src/llm/prompts.rs

//! Prompt templates for the collaborator calls. Output is in Indonesian, the
//! language of the exam material.

use crate::{
    llm::{
        AnswerEvaluationRequest, ExplanationRequest, HintRequest, QuestionsRequest,
        QuizEvaluationRequest, ReadingMaterialRequest, RegenerateRequest,
    },
    models::question::{QuestionType, QuizDifficulty},
};

pub const SYSTEM_PROMPT: &str = "Anda adalah asisten pembelajaran untuk ujian logistik rumah sakit \
di Indonesia. Jawab selalu dalam bahasa Indonesia.";

/// Topics that come with a curated list of subtopics.
pub const BUILT_IN_TOPICS: [&str; 4] = [
    "Manajemen Inventori",
    "Pengadaan Medis",
    "SOP Logistik",
    "Distribusi Obat",
];

/// Subtopics the generator should cover for a built-in topic. Empty otherwise.
pub fn topic_guidelines(topic: &str) -> &'static [&'static str] {
    match topic {
        "Manajemen Inventori" => &[
            "Sistem FIFO, FEFO, dan LIFO",
            "ABC Analysis dan kategorisasi obat",
            "Stock opname dan cycle counting",
            "Minimum-maximum stock levels",
            "Cold chain management",
            "Expired drug management",
            "Inventory turnover ratio",
            "Storage requirements dan kondisi penyimpanan",
        ],
        "Pengadaan Medis" => &[
            "Proses tender dan e-procurement",
            "Vendor qualification dan evaluation",
            "Purchase requisition dan purchase order",
            "Good Receipt Process",
            "Quality control dan incoming inspection",
            "Contract management",
            "Budget planning dan cost control",
            "Regulatory compliance (BPOM, ISO)",
        ],
        "SOP Logistik" => &[
            "Standard Operating Procedures",
            "Receiving dan put-away process",
            "Pick, pack, dan dispatch procedures",
            "Documentation dan record keeping",
            "Safety procedures dan handling",
            "Emergency procedures",
            "Quality assurance protocols",
            "Audit trails dan traceability",
        ],
        "Distribusi Obat" => &[
            "Unit Dose Dispensing (UDD)",
            "Floor stock management",
            "Medication distribution systems",
            "Controlled substance handling",
            "Patient-specific medication",
            "Automated dispensing systems",
            "Medication reconciliation",
            "Distribution scheduling dan routing",
        ],
        _ => &[],
    }
}

fn bullets(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn difficulty_label(difficulty: QuizDifficulty) -> &'static str {
    match difficulty {
        QuizDifficulty::Mixed => "campuran (easy, medium, hard)",
        other => other.as_str(),
    }
}

const QUESTION_FORMAT: &str = r#"Setiap soal berupa objek JSON dengan field:
- "type": "multiple-choice", "true-false", atau "short-answer"
- "difficulty": "easy", "medium", atau "hard"
- "question": pertanyaan yang jelas dan spesifik
- "options": array 4 opsi, hanya untuk pilihan ganda
- "correctAnswer": untuk pilihan ganda index opsi yang benar ("0" sampai "3"), untuk benar/salah "true" atau "false", untuk jawaban singkat jawaban yang diharapkan
- "explanation": penjelasan mengapa jawaban tersebut benar
- "aiHint": petunjuk yang mengarahkan tanpa memberikan jawaban
- "tags": array kategori"#;

pub fn generate_questions(req: &QuestionsRequest) -> String {
    let guidelines = topic_guidelines(&req.topic);
    let focus = if guidelines.is_empty() {
        String::new()
    } else {
        format!("\nCakupan topik \"{}\":\n{}\n", req.topic, bullets(guidelines))
    };

    format!(
        r#"Buatlah {count} soal ujian untuk topik "{topic}" dalam konteks logistik rumah sakit Indonesia.

Persyaratan:
- Campuran jenis soal: pilihan ganda (4 opsi), benar/salah, dan jawaban singkat
- Tingkat kesulitan: {difficulty}
- Sesuai dengan standar dan regulasi rumah sakit Indonesia
- Gunakan terminologi medis dan logistik yang tepat
{focus}
{format}

Kembalikan JSON: {{"questions": [ ... ]}}"#,
        count = req.count,
        topic = req.topic,
        difficulty = difficulty_label(req.difficulty),
        focus = focus,
        format = QUESTION_FORMAT,
    )
}

pub fn regenerate_question(req: &RegenerateRequest) -> String {
    let shape = match req.question_type {
        QuestionType::MultipleChoice => {
            "Sediakan 4 opsi dengan 1 jawaban benar; correctAnswer berupa index opsi."
        }
        QuestionType::TrueFalse => "Buat pernyataan; correctAnswer berupa \"true\" atau \"false\".",
        QuestionType::ShortAnswer => {
            "Buat pertanyaan yang membutuhkan jawaban 2-3 kalimat; correctAnswer berupa jawaban yang diharapkan."
        }
    };

    format!(
        r#"Buatlah variasi baru dari soal berikut dengan topik dan tingkat kesulitan yang sama.

Soal asli: "{original}"
Topik: {topic}
Tingkat kesulitan: {difficulty}
Jenis soal: {kind}

Pertanyaan harus berbeda dari soal asli, memakai skenario lain, dan tetap relevan dengan logistik rumah sakit Indonesia.
{shape}

{format}

Kembalikan JSON: {{"question": {{ ... }}}}"#,
        original = req.original_question,
        topic = req.topic,
        difficulty = req.difficulty,
        kind = req.question_type,
        shape = shape,
        format = QUESTION_FORMAT,
    )
}

pub fn reading_material(req: &ReadingMaterialRequest) -> String {
    let guidelines = topic_guidelines(&req.topic);
    format!(
        r#"Buatlah materi pembelajaran komprehensif tentang "{topic}" untuk tingkat {difficulty}, dalam konteks logistik rumah sakit Indonesia.

Gunakan format markdown dengan judul, subjudul, poin-poin penting, contoh kasus, dan ringkasan.
{focus}
Kembalikan JSON: {{"material": {{"title": "...", "content": "...", "difficulty": "{difficulty}", "tags": ["..."]}}}}"#,
        topic = req.topic,
        difficulty = req.difficulty,
        focus = bullets(guidelines),
    )
}

pub fn explanation(req: &ExplanationRequest) -> String {
    format!(
        r#"Sebagai tutor logistik rumah sakit, jelaskan soal berikut secara detail dan mudah dipahami.

Pertanyaan: "{question}"
Jawaban pengguna: "{answer}"
Jawaban benar: "{correct}"
Topik: {topic}

Jelaskan mengapa jawaban yang benar tepat, di mana letak kekeliruan jawaban pengguna bila ada, dan konsep yang perlu diingat."#,
        question = req.question,
        answer = req.user_answer,
        correct = req.correct_answer,
        topic = req.topic,
    )
}

pub fn hint(req: &HintRequest) -> String {
    format!(
        r#"Sebagai tutor AI, berikan petunjuk untuk soal berikut tanpa memberikan jawaban langsung.

Pertanyaan: "{question}"
Topik: {topic}

Arahkan pemikiran ke arah yang benar, berikan konteks atau kerangka berpikir, dan gunakan analogi bila membantu."#,
        question = req.question,
        topic = req.topic,
    )
}

pub fn evaluate_answer(req: &AnswerEvaluationRequest) -> String {
    format!(
        r#"Sebagai evaluator ujian logistik rumah sakit, evaluasi jawaban berikut.

Pertanyaan: "{question}"
Jenis soal: {kind}
Jawaban pengguna: "{answer}"
Jawaban benar: "{correct}"
Topik: {topic}

Kembalikan JSON: {{"score": 0-100, "isCorrect": true/false, "feedback": "...", "keyPoints": ["..."], "suggestions": "..."}}"#,
        question = req.question,
        kind = req.question_type,
        answer = req.user_answer,
        correct = req.correct_answer,
        topic = req.topic,
    )
}

pub fn evaluate_quiz(req: &QuizEvaluationRequest) -> String {
    let lines = req
        .questions
        .iter()
        .zip(&req.user_answers)
        .zip(&req.evaluations)
        .enumerate()
        .map(|(i, ((question, answer), eval))| {
            format!(
                "{}. {}\n   Jawaban: {}\n   Skor: {:.0}",
                i + 1,
                question,
                answer,
                eval.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Sebagai evaluator ujian logistik rumah sakit, berikan analisis menyeluruh atas kuis berikut.

Topik: {topic}
Tingkat kesulitan: {difficulty}
Jumlah soal: {total}
Waktu pengerjaan: {minutes} menit

{lines}

Kembalikan JSON dengan field: overallScore (0-100), performance {{excellent, good, needsImprovement}}, learningRecommendations {{priorityTopics, studyPlan, resources}}, strengths, weaknesses, nextSteps, motivationalMessage."#,
        topic = req.topic,
        difficulty = difficulty_label(req.difficulty),
        total = req.total_questions,
        minutes = req.time_spent / 60,
        lines = lines,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_topics_have_guidelines() {
        for topic in BUILT_IN_TOPICS {
            assert_eq!(topic_guidelines(topic).len(), 8, "{}", topic);
        }
        assert!(topic_guidelines("Topik Lain").is_empty());
    }

    #[test]
    fn question_prompt_mentions_count_and_focus() {
        let prompt = generate_questions(&QuestionsRequest {
            topic: "Distribusi Obat".into(),
            count: 7,
            difficulty: QuizDifficulty::Mixed,
        });
        assert!(prompt.contains("Buatlah 7 soal"));
        assert!(prompt.contains("Unit Dose Dispensing"));
        assert!(prompt.contains("campuran"));
    }
}
