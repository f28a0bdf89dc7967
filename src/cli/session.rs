use anyhow::Result;
use clap::Parser;

use crate::auth::{AuthProvider, Identity};

use super::Workspace;

#[derive(Debug, Parser)]
pub struct LoginCommand {
    #[arg(long, short, help = "User whose entries will be used")]
    user: String,
    #[arg(long, short)]
    email: Option<String>,
}

pub async fn login(workspace: &Workspace, command: LoginCommand) -> Result<()> {
    let identity = Identity {
        user_id: command.user.into(),
        email: command.email,
    };
    workspace.auth.sign_in(&identity).await?;
    println!("Signed in as {}", identity.user_id);
    Ok(())
}

pub async fn logout(workspace: &Workspace) -> Result<()> {
    workspace.auth.sign_out().await?;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(workspace: &Workspace) -> Result<()> {
    let Some(identity) = workspace.auth.current_identity().await else {
        println!("Not signed in");
        return Ok(());
    };
    match identity.email {
        Some(email) => print!("{} <{email}>", identity.user_id),
        None => print!("{}", identity.user_id),
    }
    println!(", {} entries", workspace.store.entries().len());
    Ok(())
}
