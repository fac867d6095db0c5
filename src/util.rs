//! Small utility helpers used across modules.

/// Single-pass string templating.
///
/// `{key}` is replaced by the matching value, `{{` and `}}` render literal braces,
/// and any other brace is copied as-is. Substituted values are never rescanned,
/// so a value that itself contains `{question}` (or any JSON) stays untouched.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;

  while let Some(pos) = rest.find(|c| c == '{' || c == '}') {
    out.push_str(&rest[..pos]);
    let tail = &rest[pos..];

    if tail.starts_with("{{") || tail.starts_with("}}") {
      out.push_str(&tail[..1]);
      rest = &tail[2..];
      continue;
    }

    if tail.starts_with('{') {
      if let Some(end) = tail.find('}') {
        let key = &tail[1..end];
        if let Some((_, value)) = pairs.iter().find(|(k, _)| *k == key) {
          out.push_str(value);
          rest = &tail[end + 1..];
          continue;
        }
      }
    }

    // Lone brace or unknown key: copy one char and move on.
    out.push_str(&tail[..1]);
    rest = &tail[1..];
  }

  out.push_str(rest);
  out
}

/// Cap a string at `max` characters, marking the cut with an ellipsis.
pub fn cap_chars(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((idx, _)) => format!("{}…", &s[..idx]),
    None => s.to_string(),
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge model payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
