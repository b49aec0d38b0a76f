//! Sign-in lifecycle.

use secrecy::SecretString;

use super::{CliError, Context};

/// # Errors
///
/// Returns the store error for invalid input or rejected credentials.
#[allow(clippy::print_stdout)]
pub async fn login(ctx: &Context, email: &str, password: String) -> Result<(), CliError> {
    let user = ctx
        .stores
        .auth
        .login(email, &SecretString::from(password))
        .await?;
    println!("Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

/// Drop the credential and every per-user cache.
#[allow(clippy::print_stdout)]
pub fn logout(ctx: &Context) {
    ctx.stores.teardown();
    println!("Signed out");
}

/// # Errors
///
/// Returns [`CliError::NotSignedIn`] or the profile call's error.
#[allow(clippy::print_stdout)]
pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    let user = ctx.require_user().await?;
    println!("{} <{}> ({})", user.name, user.email, user.role);
    if user.is_blocked {
        println!("This account is blocked");
    }
    Ok(())
}
