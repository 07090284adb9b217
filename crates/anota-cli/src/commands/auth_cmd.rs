use anota_core::auth::SignUpOutcome;
use anota_core::notice::AUTH_FAILED_MESSAGE;
use anota_core::session::{log_in, log_out, register, CHECK_EMAIL_MESSAGE};

use crate::auth::{clear_stored_session, ProfileBackend};
use crate::cli::AuthCommands;
use crate::commands::common::{prompt_confirmation, session_error};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let opened = ProfileBackend::open(profile)?;
            let user = log_in(&opened.backend, &email, &password)
                .await
                .map_err(|error| CliError::notice(&error, AUTH_FAILED_MESSAGE))?;
            let email_label = user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Signed in profile '{}' as {email_label}",
                opened.profile_name
            );
            Ok(())
        }
        AuthCommands::Register { email, password } => {
            let opened = ProfileBackend::open(profile)?;
            let outcome = register(&opened.backend, &email, &password)
                .await
                .map_err(|error| CliError::notice(&error, AUTH_FAILED_MESSAGE))?;
            match outcome {
                SignUpOutcome::SignedIn(session) => {
                    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!(
                        "Registered and signed in profile '{}' as {email_label}",
                        opened.profile_name
                    );
                }
                SignUpOutcome::ConfirmationRequired => println!("{CHECK_EMAIL_MESSAGE}"),
            }
            Ok(())
        }
        AuthCommands::Status => {
            let opened = match ProfileBackend::open(profile) {
                Ok(opened) => opened,
                Err(CliError::NotConfigured(profile_name)) => {
                    println!("Profile '{profile_name}' is not configured.");
                    return Ok(());
                }
                Err(error) => return Err(error),
            };

            let session = opened
                .backend
                .restore_session()
                .await
                .map_err(|error| session_error(&error))?;
            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Profile '{}' is signed in as {} (expires_at={})",
                    opened.profile_name, email_label, session.expires_at
                );
            } else {
                println!("Profile '{}' is not signed in.", opened.profile_name);
            }
            Ok(())
        }
        AuthCommands::Logout { yes } => {
            let confirm = |prompt: &str| yes || prompt_confirmation(prompt);
            let profile_name = match ProfileBackend::open(profile) {
                Ok(opened) => {
                    let signed_out = log_out(&opened.backend, &confirm)
                        .await
                        .map_err(|error| CliError::notice(&error, AUTH_FAILED_MESSAGE))?;
                    if !signed_out {
                        println!("Cancelled");
                        return Ok(());
                    }
                    opened.profile_name
                }
                Err(CliError::NotConfigured(profile_name)) => {
                    clear_stored_session(&profile_name)?;
                    profile_name
                }
                Err(error) => return Err(error),
            };

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

