use problem_board_errors::AppError;

const MAX_QUERY_CHARS: usize = 2000;
const MAX_METADATA_CHARS: usize = 200;

pub struct InputSanitizer;

impl InputSanitizer {
    /// Trims a problem description and rejects blank or oversized input.
    pub fn validate_problem_query(query: &str) -> Result<String, AppError> {
        let query = query.trim();

        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "problem description must not be empty".to_string(),
            ));
        }

        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(AppError::InvalidInput(
                "problem description is too long".to_string(),
            ));
        }

        Ok(Self::strip_control(query, MAX_QUERY_CHARS))
    }

    /// Diagnostic metadata is free text; it is cleaned and cut, never rejected.
    pub fn sanitize_metadata(value: &str) -> String {
        Self::strip_control(value.trim(), MAX_METADATA_CHARS)
    }

    fn strip_control(value: &str, limit: usize) -> String {
        value
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .take(limit)
            .collect()
    }
}
