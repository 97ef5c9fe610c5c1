//! Log output for the service. `LOG_LEVEL` takes an `EnvFilter` directive string,
//! `LOG_FORMAT=json` switches to one JSON object per line.
//!
//! The code logs under three targets, so a filter like
//! `info,generation=debug` narrows output to model traffic:
//! `pdfstudy` for startup and transport, `generation` for model calls and
//! `session` for per-connection state changes.

use tracing_subscriber::EnvFilter;

/// Used when `LOG_LEVEL` is unset or does not parse.
const DEFAULT_FILTER: &str = "info,pdfstudy=debug,generation=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
  Pretty,
  Json,
}

impl LogFormat {
  fn parse(value: Option<&str>) -> Self {
    match value.map(str::trim) {
      Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
      _ => LogFormat::Pretty,
    }
  }
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
  directives
    .and_then(|d| EnvFilter::try_new(d).ok())
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. A second call (tests, embedding) is a no-op.
pub fn init_tracing() {
  let directives = std::env::var("LOG_LEVEL").ok();
  let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter_from(directives.as_deref()))
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  let installed = match format {
    LogFormat::Json => builder.json().try_init(),
    LogFormat::Pretty => builder.try_init(),
  };
  if installed.is_ok() {
    tracing::debug!(target: "pdfstudy", ?format, "Tracing initialized");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_json_selects_json_output() {
    assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
    assert_eq!(LogFormat::parse(Some(" JSON ")), LogFormat::Json);
    assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Pretty);
    assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
  }

  #[test]
  fn missing_level_uses_default_directives() {
    assert_eq!(filter_from(None).to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    assert_eq!(filter_from(Some("warn")).to_string(), EnvFilter::new("warn").to_string());
  }
}
