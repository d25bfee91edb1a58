#[cfg(test)]
mod tests {
    use crate::env::{AppConfig, MAX_SESSION_HOURS};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", None::<&str>),
                ("SESSION_HOURS", None),
                ("SESSION_CLEANUP_SECS", None),
            ],
            || {
                let config = AppConfig::from_env().expect("Defaults should load");
                assert_eq!(config, AppConfig::default());
                assert_eq!(config.database_url, "sqlite://goal_tracker.db?mode=rwc");
                assert_eq!(config.session_hours, 1);
                assert_eq!(config.session_cleanup_secs, 3600);
            },
        );
    }

    #[test]
    #[serial]
    fn test_config_from_environment() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite::memory:")),
                ("SESSION_HOURS", Some("12")),
                ("SESSION_CLEANUP_SECS", Some(" 60 ")),
            ],
            || {
                let config = AppConfig::from_env().expect("Config should load");
                assert_eq!(config.database_url, "sqlite::memory:");
                assert_eq!(config.session_hours, 12);
                assert_eq!(config.session_cleanup_secs, 60);
            },
        );
    }

    #[test]
    #[serial]
    fn test_blank_database_url_falls_back() {
        temp_env::with_var("DATABASE_URL", Some("   "), || {
            let config = AppConfig::from_env().expect("Config should load");
            assert_eq!(config.database_url, AppConfig::default().database_url);
        });
    }

    #[test]
    #[serial]
    fn test_invalid_session_settings() {
        for hours in ["0", "-3", "soon"] {
            temp_env::with_var("SESSION_HOURS", Some(hours), || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(
                    err.to_string().contains("SESSION_HOURS"),
                    "unexpected error for {}: {}",
                    hours,
                    err
                );
            });
        }

        temp_env::with_vars(
            [
                ("SESSION_HOURS", None::<&str>),
                ("SESSION_CLEANUP_SECS", Some("hourly")),
            ],
            || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("SESSION_CLEANUP_SECS"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_oversized_session_hours_rejected() {
        let just_over = (MAX_SESSION_HOURS + 1).to_string();
        for hours in ["3000000000", just_over.as_str()] {
            temp_env::with_var("SESSION_HOURS", Some(hours), || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("SESSION_HOURS"), "{}", err);
            });
        }

        temp_env::with_var("SESSION_HOURS", Some(MAX_SESSION_HOURS.to_string()), || {
            let config = AppConfig::from_env().expect("Upper bound should be accepted");
            assert_eq!(config.session_hours, MAX_SESSION_HOURS);
        });
    }

    #[test]
    #[serial]
    fn test_zero_cleanup_interval_rejected() {
        temp_env::with_vars(
            [
                ("SESSION_HOURS", None::<&str>),
                ("SESSION_CLEANUP_SECS", Some("0")),
            ],
            || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("SESSION_CLEANUP_SECS"), "{}", err);
            },
        );
    }
}
