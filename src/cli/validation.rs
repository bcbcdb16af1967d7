use crate::cli::args::{CliArgs, Command};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.cache_strategy.as_deref() {
        if crate::cache::CacheStrategy::parse(raw).is_none() {
            return Err(format!(
                "invalid --cache-strategy '{raw}', expected cache-first or network-first"
            ));
        }
    }
    if let Some(raw) = args.data.as_deref() {
        if raw.trim().is_empty() {
            return Err("invalid --data, expected a path or URL".to_string());
        }
    }

    match args.command.as_ref() {
        Some(Command::Render(render)) => {
            if let Some(raw) = render.output_format.as_deref() {
                if crate::output::OutputFormat::parse(raw).is_none() {
                    return Err(format!(
                        "invalid --output-format '{raw}', expected text, json or html"
                    ));
                }
            }
            if let Some(raw) = render.fuzzy_threshold.as_deref() {
                crate::utils::parse_fuzzy_threshold(raw)
                    .map_err(|e| format!("invalid --fuzzy-threshold '{raw}': {e}"))?;
            }
        }
        Some(Command::Theme { theme: Some(raw) }) => {
            if crate::theme::Theme::parse(raw).is_none() {
                return Err(format!(
                    "invalid theme '{raw}', expected light, dark or auto"
                ));
            }
        }
        Some(Command::Accent { accent, shift }) => {
            if accent.is_none() && shift.is_none() {
                return Err("accent requires a color or --shift".to_string());
            }
            if let Some(raw) = accent.as_deref() {
                crate::theme::Accent::parse(raw)?;
            }
            if let Some(shift) = shift {
                let max = crate::theme::MAX_ACCENT_SHIFT;
                if !(-max..=max).contains(shift) {
                    return Err(format!("invalid --shift {shift}, expected -{max}..{max}"));
                }
            }
        }
        Some(Command::View { view }) => {
            if crate::store::ViewMode::parse(view).is_none() {
                return Err(format!("invalid view '{view}', expected grid or list"));
            }
        }
        _ => {}
    }
    Ok(())
}
