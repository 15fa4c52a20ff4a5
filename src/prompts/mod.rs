//! LLM prompts for the Q&A generation pipeline.
//!
//! Contains the system prompts for each pipeline stage and builders that
//! assemble the matching user prompts. System prompts are in Bahasa Melayu,
//! the default target language of the pipeline; the generation builder
//! injects the configured language tag so other targets work unchanged.

/// System and user message pair for one LLM call.
#[derive(Debug, Clone)]
pub struct StagePrompt {
    /// System prompt establishing the agent's role.
    pub system: String,
    /// User prompt with the text to act on.
    pub user: String,
}

/// System prompt for the pre-filter stage.
///
/// The model classifies whether a chunk is suitable source material,
/// rejecting metadata blocks and off-language text.
pub const PREFILTER_SYSTEM: &str = r#"Anda ialah penyaring awal untuk penjanaan Soal-Jawab.

TOLAK teks yang:
- terdiri daripada metadata fail (penulis, e-mel, jurnal, tarikh, rujukan)
- bukan dalam bahasa sasaran
- tidak mengandungi kandungan bermakna untuk Soal-Jawab

Pulangkan SATU objek JSON sahaja:
{"status":"accept"|"reject","reason":"..."}"#;

/// System prompt for the generation stage.
///
/// The model emits strict JSONL: one `{question, answer, source}` object per
/// line, nothing else.
pub const GENERATOR_SYSTEM: &str = r#"Anda ialah penjana pasangan Soal-Jawab.

Peraturan:
- Setiap pasangan mesti disokong dengan jelas oleh teks yang diberi.
- Soalan mesti unik dan merangkumi pelbagai aras: ingatan fakta, pemahaman, dan analisis.
- Jangan gunakan metadata (nama penulis, e-mel, jurnal, nombor rujukan).
- Format output: JSONL sahaja, satu objek per baris, tanpa teks lain:
{"question":"...","answer":"...","source":""}"#;

/// System prompt for the review stage.
///
/// The model returns a single verdict object; `edit` carries corrected text.
pub const REVIEWER_SYSTEM: &str = r#"Anda ialah penyemak pasangan Soal-Jawab.

Semak:
1. Jawapan disokong oleh teks sumber.
2. Tiada kebocoran metadata (nama penulis, e-mel, nombor sitasi, nama jurnal).
3. Bahasa betul dan jelas.

Pulangkan SATU objek JSON sahaja:
{"status":"accept"|"edit"|"reject","question":"...","answer":"...","reason":"..."}"#;

/// Builds the pre-filter prompt for one chunk.
pub fn build_prefilter_prompt(chunk_text: &str) -> StagePrompt {
    let user = format!(
        "Teks untuk disemak:\n{}\n\nSemak teks ini dan tentukan sama ada sesuai untuk Soal-Jawab.",
        chunk_text
    );
    StagePrompt {
        system: PREFILTER_SYSTEM.to_string(),
        user,
    }
}

/// Builds the generation prompt for one accepted chunk.
///
/// # Arguments
///
/// * `chunk_text` - The supporting text.
/// * `source` - The source identifier the model must echo.
/// * `language` - Target language tag (e.g. "Bahasa Melayu").
/// * `cap` - Maximum number of pairs to request for this chunk.
pub fn build_generation_prompt(
    chunk_text: &str,
    source: &str,
    language: &str,
    cap: usize,
) -> StagePrompt {
    let user = format!(
        "Nama fail: {source}\n\nPetikan teks:\n{chunk_text}\n\nArahan: Hasilkan sehingga {cap} pasangan Soal-Jawab dalam {language}. Setiap pasangan mesti unik dan disokong jelas oleh teks. Format JSONL (satu objek per baris) dengan kunci: question, answer, source."
    );
    StagePrompt {
        system: GENERATOR_SYSTEM.to_string(),
        user,
    }
}

/// Builds the review prompt for one candidate pair.
///
/// The candidate is embedded as JSON next to its supporting chunk text.
pub fn build_review_prompt(pair_json: &str, supporting_text: &str) -> StagePrompt {
    let user = format!(
        "Teks sumber:\n{supporting_text}\n\nPasangan cadangan:\n{pair_json}\n\nSemak pasangan ini dan pulangkan SATU objek JSON sahaja dengan status (accept/edit/reject), question, answer, dan reason."
    );
    StagePrompt {
        system: REVIEWER_SYSTEM.to_string(),
        user,
    }
}
