//! Normalize repository identifiers and change references for stable comparison.

use crate::error::EngineError;

const HOST_PREFIXES: [&str; 4] = [
  "https://github.com/",
  "http://github.com/",
  "https://www.github.com/",
  "http://www.github.com/",
];

/// Reduce a repository URL or path to `owner/name`.
///
/// - trims whitespace, trailing `/` and `.git`
/// - strips a github.com host prefix
/// - rejects anything that is not exactly two non-empty segments
pub fn repo_path(repo_url: &str) -> Result<String, EngineError> {
  let mut s = repo_url.trim().trim_end_matches('/');
  if let Some(stripped) = s.strip_suffix(".git") {
    s = stripped;
  }
  for prefix in HOST_PREFIXES {
    if s.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
      s = &s[prefix.len()..];
      break;
    }
  }

  if s.is_empty() {
    return Err(EngineError::validation("repo_url", "must not be empty"));
  }
  let segments: Vec<&str> = s.split('/').collect();
  if segments.len() != 2 || segments.iter().any(|seg| seg.is_empty() || seg.contains(char::is_whitespace)) {
    return Err(EngineError::validation("repo_url", "expected owner/name or a github.com URL"));
  }
  Ok(s.to_string())
}

/// Reference number encoded in a change id: the token after the last `/pr/`.
pub fn change_reference(change_id: &str) -> Option<&str> {
  let idx = change_id.rfind("/pr/")?;
  let reference = &change_id[idx + "/pr/".len()..];
  if reference.is_empty() {
    None
  } else {
    Some(reference)
  }
}
