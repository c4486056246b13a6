//! Read-aloud text for a question.

use exam_core::types::Question;

/// Compose the utterance for the question at `index` (0-based).
///
/// `"Question 2: Capital of France?. Options are: A. Paris, B. Rome"`.
/// Free-text questions stop after the question text.
pub fn read_aloud_text(index: usize, question: &Question) -> String {
    let mut text = format!("Question {}: {}", index + 1, question.text);

    let options = question.lettered_options();
    if !options.is_empty() {
        let listed: Vec<String> = options
            .iter()
            .map(|(letter, option)| format!("{}. {}", letter, option))
            .collect();
        text.push_str(". Options are: ");
        text.push_str(&listed.join(", "));
    }

    text
}
