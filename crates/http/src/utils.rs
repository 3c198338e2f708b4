/// Returns early with `$error` unless `$predicate` holds.
///
/// Used for limit checks while decoding, where a violated limit is a parse error rather than
/// a panic.
///
/// ```ignore
/// ensure!(headers.len() < MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
