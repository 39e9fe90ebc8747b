//! `chatty hook`: Create a continuity hook.

use chatty_continuity::HookOptions;
use chatty_core::hook::{HookAction, HookTrigger};

use super::{CliResult, build_injector, load_config, open_ledger};

pub async fn run(user: &str, trigger: &str, message: String, priority: i32) -> CliResult {
    let trigger = parse_trigger(trigger)?;
    let config = load_config()?;
    let injector = build_injector(&config, open_ledger(&config))?;

    let hook = injector
        .create_continuity_hook(
            user,
            trigger,
            HookAction::Message { text: message },
            HookOptions { priority },
        )
        .await?;

    println!(
        "Created {} hook {} (priority {})",
        hook.trigger.kind(),
        hook.id,
        hook.priority
    );
    Ok(())
}

/// Parse `session-start`, `topic:<T>`, `keyword:<K>` or `hours:<S>-<E>`.
pub fn parse_trigger(raw: &str) -> Result<HookTrigger, String> {
    if raw == "session-start" {
        return Ok(HookTrigger::SessionStart);
    }

    let (kind, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid trigger '{raw}'"))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("trigger '{kind}' needs a value"));
    }

    match kind {
        "topic" => Ok(HookTrigger::Topic {
            topic: value.to_string(),
        }),
        "keyword" => Ok(HookTrigger::Keyword {
            keyword: value.to_string(),
        }),
        "hours" => {
            let (start, end) = value
                .split_once('-')
                .ok_or_else(|| format!("hours must look like 9-17, got '{value}'"))?;
            let parse_hour = |h: &str| -> Result<u32, String> {
                let hour: u32 = h
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid hour '{h}'"))?;
                if hour > 23 {
                    return Err(format!("hour {hour} out of range 0-23"));
                }
                Ok(hour)
            };
            Ok(HookTrigger::TimeWindow {
                start_hour: parse_hour(start)?,
                end_hour: parse_hour(end)?,
            })
        }
        other => Err(format!("unknown trigger kind '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_trigger_kind() {
        assert_eq!(parse_trigger("session-start").unwrap(), HookTrigger::SessionStart);
        assert_eq!(
            parse_trigger("topic:gardening").unwrap(),
            HookTrigger::Topic {
                topic: "gardening".into()
            }
        );
        assert_eq!(
            parse_trigger("keyword: tired ").unwrap(),
            HookTrigger::Keyword {
                keyword: "tired".into()
            }
        );
        assert_eq!(
            parse_trigger("hours:22-6").unwrap(),
            HookTrigger::TimeWindow {
                start_hour: 22,
                end_hour: 6
            }
        );
    }

    #[test]
    fn rejects_malformed_triggers() {
        assert!(parse_trigger("sometimes").is_err());
        assert!(parse_trigger("topic:").is_err());
        assert!(parse_trigger("hours:9").is_err());
        assert!(parse_trigger("hours:9-24").is_err());
        assert!(parse_trigger("mood:happy").is_err());
    }
}
