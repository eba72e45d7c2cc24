//! Two truths and a lie.

use rand::seq::SliceRandom;

use crate::error::SubmissionError;
use crate::types::{Payload, Statement};

/// Build the payload, drawing the display permutation once
pub fn build(texts: [String; 3], lie_index: usize) -> Result<Payload, SubmissionError> {
    if lie_index > 2 {
        return Err(SubmissionError::InvalidLieIndex(lie_index));
    }
    if texts.iter().any(|t| t.trim().is_empty()) {
        return Err(SubmissionError::IncompleteStatements);
    }

    let mut statements = texts.map(|text| Statement {
        text: text.trim().to_string(),
        is_lie: false,
    });
    statements[lie_index].is_lie = true;

    let mut display_order = [0, 1, 2];
    display_order.shuffle(&mut rand::rng());

    Ok(Payload::Statements {
        statements,
        display_order,
    })
}

/// All three filled in, exactly one lie, and a valid permutation
pub fn is_complete(statements: &[Statement; 3], display_order: &[usize; 3]) -> bool {
    let mut seen = [false; 3];
    for &i in display_order {
        if i > 2 || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    statements.iter().all(|s| !s.text.trim().is_empty()) && lie_index(statements).is_some()
}

/// Index of the lie, if exactly one statement is flagged
pub fn lie_index(statements: &[Statement; 3]) -> Option<usize> {
    let mut lies = statements.iter().enumerate().filter(|(_, s)| s.is_lie);
    match (lies.next(), lies.next()) {
        (Some((i, _)), None) => Some(i),
        _ => None,
    }
}

pub fn is_correct(statements: &[Statement; 3], guessed_index: usize) -> bool {
    lie_index(statements) == Some(guessed_index)
}
