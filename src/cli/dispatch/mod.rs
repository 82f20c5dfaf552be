use crate::cli::actions::Action;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        base_url: matches
            .get_one::<String>("base-url")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --base-url"))?,
        backend: matches
            .get_one::<String>("session-backend")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --session-backend"))?,
        dsn: matches.get_one::<String>("dsn").cloned(),
        session_ttl: matches
            .get_one::<i64>("session-ttl")
            .copied()
            .unwrap_or(1_209_600),
        lockout_threshold: matches
            .get_one::<u32>("lockout-threshold")
            .copied()
            .unwrap_or(6),
        lockout_cooldown: matches
            .get_one::<i64>("lockout-cooldown")
            .copied()
            .unwrap_or(1800),
        rate_limit: matches.get_one::<u32>("rate-limit").copied().unwrap_or(30),
        rate_window: matches.get_one::<i64>("rate-window").copied().unwrap_or(300),
        password_max_age: matches.get_one::<i64>("password-max-age").copied(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_server_action_from_defaults() -> Result<()> {
        let matches = commands::new().get_matches_from(vec!["aula"]);
        let action = handler(&matches)?;

        let Action::Server {
            port,
            backend,
            dsn,
            session_ttl,
            lockout_threshold,
            password_max_age,
            ..
        } = action;

        assert_eq!(port, 8080);
        assert_eq!(backend, "memory");
        assert_eq!(dsn, None);
        assert_eq!(session_ttl, 1_209_600);
        assert_eq!(lockout_threshold, 6);
        assert_eq!(password_max_age, None);
        Ok(())
    }
}
