/// Generate an id from a millisecond timestamp, bumping it until it is not
/// already taken.
pub(crate) fn next_id(now_ms: i64, taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = now_ms;
    loop {
        let id = candidate.to_string();
        if !taken(&id) {
            return id;
        }
        candidate += 1;
    }
}
