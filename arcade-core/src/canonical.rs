use crate::domain::{LeaderboardSubmission, CHECKSUM_FIELDS};

/// Hand-rolled deterministic encoder for the leaderboard checksum input.
///
/// `serde_json::to_string` is not used here: its numeric formatting and
/// escaping are an implementation detail of the `serde_json` version in use,
/// not a guarantee, and the client's encoder is a separate implementation
/// that must produce byte-identical output. Only the whitelisted fields in
/// [`CHECKSUM_FIELDS`] participate, in lexicographic key order, with no
/// whitespace.
pub fn canonical_checksum_input(submission: &LeaderboardSubmission) -> String {
    let mut out = String::from("{");
    for (i, field) in CHECKSUM_FIELDS.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(field);
        out.push_str("\":");
        out.push_str(&canonical_value(*field, submission));
    }
    out.push('}');
    out
}

fn canonical_value(field: &str, s: &LeaderboardSubmission) -> String {
    match field {
        "difficulty" => quote(&s.difficulty),
        "gameDurationMs" => s.game_duration_ms.to_string(),
        "isVictory" => s.is_victory.to_string(),
        "kills" => s.kills.to_string(),
        "level" => s.level.to_string(),
        "maxCombo" => s.max_combo.to_string(),
        "score" => s.score.to_string(),
        "startWave" => s.start_wave.to_string(),
        "wave" => s.wave.to_string(),
        _ => unreachable!("field not in CHECKSUM_FIELDS whitelist"),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LeaderboardSubmission {
        LeaderboardSubmission {
            difficulty: "hard".into(),
            game_duration_ms: 120_000,
            is_victory: true,
            kills: 42,
            level: 7,
            max_combo: 12,
            score: 9000,
            start_wave: 1,
            wave: 10,
            continues_used: 0,
            run_detail: serde_json::json!({}),
        }
    }

    #[test]
    fn canonical_form_is_stable_and_sorted() {
        let encoded = canonical_checksum_input(&sample());
        assert_eq!(
            encoded,
            "{\"difficulty\":\"hard\",\"gameDurationMs\":120000,\"isVictory\":true,\"kills\":42,\"level\":7,\"maxCombo\":12,\"score\":9000,\"startWave\":1,\"wave\":10}"
        );
    }

    #[test]
    fn mutating_a_field_changes_the_encoding() {
        let mut s = sample();
        let base = canonical_checksum_input(&s);
        s.score += 1;
        assert_ne!(base, canonical_checksum_input(&s));
    }
}
