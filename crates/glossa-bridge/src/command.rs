//! Typed outbound commands and their script encoding.
//!
//! The overlay script exposes one evaluation entry point per operation;
//! every call site goes through [`Command::encode`] so the escaping
//! contract lives in exactly one place.

use crate::escape::escape_script_arg;

const SIGN_IN_FN: &str = "lingVisSdk.polyReadiumSignIn";
const FETCH_SETTINGS_FN: &str = "lingVisSdk.polyReadiumGetSettings";
const UPDATE_SETTINGS_FN: &str = "lingVisSdk.polyReadiumUpdateSettings";

/// An outbound call into the overlay script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Establish or refresh a session. Session-start issues this with the
    /// current token and empty credentials; explicit sign-in issues it with
    /// credentials, an empty token, and the new-account flag.
    SignIn {
        token: String,
        email: String,
        password: String,
        app_id: String,
        document_key: String,
        new_account: Option<bool>,
    },
    /// Fetch the user's overlay settings blob.
    FetchSettings,
    /// Update target/source language and proficiency level. Empty fields
    /// leave the corresponding setting unchanged.
    UpdateSettings {
        target_lang: String,
        source_lang: String,
        level: String,
    },
}

impl Command {
    /// Serialize into a script expression, escaping every argument.
    ///
    /// `callback_id` may be empty for fire-and-forget issuance; the overlay
    /// then reports any outcome without a correlated reply.
    pub fn encode(&self, callback_id: &str) -> String {
        let cb = escape_script_arg(callback_id);
        match self {
            Command::SignIn {
                token,
                email,
                password,
                app_id,
                document_key,
                new_account,
            } => {
                let mut call = format!(
                    "{SIGN_IN_FN}('{cb}', '{}', '{}', '{}', '{}', '{}'",
                    escape_script_arg(token),
                    escape_script_arg(email),
                    escape_script_arg(password),
                    escape_script_arg(app_id),
                    escape_script_arg(document_key),
                );
                if let Some(new_account) = new_account {
                    call.push_str(if *new_account { ", true" } else { ", false" });
                }
                call.push(')');
                call
            }
            Command::FetchSettings => format!("{FETCH_SETTINGS_FN}('{cb}')"),
            Command::UpdateSettings {
                target_lang,
                source_lang,
                level,
            } => format!(
                "{UPDATE_SETTINGS_FN}('{cb}', '{}', '{}', '{}')",
                escape_script_arg(target_lang),
                escape_script_arg(source_lang),
                escape_script_arg(level),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_session_start_sign_in() {
        let cmd = Command::SignIn {
            token: "tok-1".into(),
            email: String::new(),
            password: String::new(),
            app_id: "reader".into(),
            document_key: "Bel-Ami:urn:isbn:123".into(),
            new_account: None,
        };
        assert_eq!(
            cmd.encode(""),
            "lingVisSdk.polyReadiumSignIn('', 'tok-1', '', '', 'reader', 'Bel-Ami:urn:isbn:123')"
        );
    }

    #[test]
    fn encodes_credential_sign_in_with_new_account_flag() {
        let cmd = Command::SignIn {
            token: String::new(),
            email: "a@b.c".into(),
            password: "hunter2".into(),
            app_id: "reader".into(),
            document_key: String::new(),
            new_account: Some(true),
        };
        assert_eq!(
            cmd.encode("cb-9"),
            "lingVisSdk.polyReadiumSignIn('cb-9', '', 'a@b.c', 'hunter2', 'reader', '', true)"
        );
    }

    #[test]
    fn encodes_fetch_settings() {
        assert_eq!(
            Command::FetchSettings.encode("cb-1"),
            "lingVisSdk.polyReadiumGetSettings('cb-1')"
        );
    }

    #[test]
    fn encodes_update_settings() {
        let cmd = Command::UpdateSettings {
            target_lang: "fr".into(),
            source_lang: "en".into(),
            level: "b1".into(),
        };
        assert_eq!(
            cmd.encode("cb-2"),
            "lingVisSdk.polyReadiumUpdateSettings('cb-2', 'fr', 'en', 'b1')"
        );
    }

    #[test]
    fn escapes_every_interpolated_argument() {
        let cmd = Command::SignIn {
            token: String::new(),
            email: "o'neil@example.com".into(),
            password: "pa\\ss'w\nord".into(),
            app_id: "reader".into(),
            document_key: "It's \"mine\":id".into(),
            new_account: Some(false),
        };
        let script = cmd.encode("cb");
        assert!(script.contains("o\\'neil@example.com"));
        assert!(script.contains("pa\\\\ss\\'w\\nord"));
        assert!(script.contains("It\\'s \\\"mine\\\":id"));
        assert!(!script.contains('\n'));
    }
}
