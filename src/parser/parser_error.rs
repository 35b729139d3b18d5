//result of a parsing step: the node (if one could be built) plus every error met on the way,
//so a single bad statement does not hide the errors that follow it

use crate::error_handler::WichError;

#[derive(Debug, Clone)]
pub struct ParseResult<T> {
    pub result: Option<T>,
    pub errors: Vec<WichError>,
}

impl<T> ParseResult<T> {
    pub fn ok(result: T) -> Self {
        ParseResult {
            result: Some(result),
            errors: Vec::new(),
        }
    }

    pub fn err(error: WichError) -> Self {
        ParseResult {
            result: None,
            errors: vec![error],
        }
    }

    pub fn with_result(result: Option<T>, errors: Vec<WichError>) -> Self {
        ParseResult { result, errors }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseResult<U> {
        ParseResult {
            result: self.result.map(f),
            errors: self.errors,
        }
    }
}

impl<T> From<Result<T, WichError>> for ParseResult<T> {
    fn from(res: Result<T, WichError>) -> Self {
        match res {
            Ok(value) => ParseResult::ok(value),
            Err(err) => ParseResult::err(err),
        }
    }
}
