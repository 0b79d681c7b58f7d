use clap::Parser;
use garde::Validate as _;
use yamdb_auth::generate_confirmation_code;
use yamdb_dal::user::{CreateUser, UserRepository};
use yamdb_types::{claim::Role, config::BackendConfig, general::ValidEmail};

use crate::commands::{open_pool, Executor};

#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "Username")]
    pub username: String,
    #[arg(short, long, help = "User email")]
    pub email: ValidEmail,
    #[arg(short, long, default_value_t = Role::User, help = "Role of the user: user, moderator or admin")]
    pub role: Role,
    #[arg(long, help = "Superuser has admin privileges regardless of role")]
    pub superuser: bool,
    #[arg(long, help = "First name")]
    pub first_name: Option<String>,
    #[arg(long, help = "Last name")]
    pub last_name: Option<String>,
    #[arg(long, help = "Short biography")]
    pub bio: Option<String>,
}

impl CreateUserCmd {
    fn new_user(&self) -> CreateUser {
        CreateUser {
            username: Some(self.username.clone()),
            email: Some(self.email.clone()),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: Some(self.role.to_string()),
            bio: self.bio.clone(),
            is_superuser: self.superuser,
        }
    }
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        let new_user = self.new_user();
        new_user.validate()?;

        let pool = open_pool(&self.backend).await?;
        let repository = UserRepository::new(pool);
        let code = generate_confirmation_code();
        let user = repository.create(new_user, &code).await?;

        println!(
            "Created user {} ({}), confirmation code: {code}",
            user.username, user.role
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cmd = CreateUserCmd::try_parse_from([
            "create-user",
            "--data-dir",
            "/tmp/yamdb",
            "-u",
            "root",
            "-e",
            "root@example.com",
            "--superuser",
        ])
        .unwrap();
        assert_eq!(cmd.role, Role::User);
        let user = cmd.new_user();
        assert!(user.is_superuser);
        assert!(user.validate().is_ok());

        assert!(CreateUserCmd::try_parse_from([
            "create-user",
            "-u",
            "root",
            "-e",
            "not-an-email",
        ])
        .is_err());
        assert!(CreateUserCmd::try_parse_from([
            "create-user",
            "-u",
            "root",
            "-e",
            "root@example.com",
            "--role",
            "owner",
        ])
        .is_err());
    }

    #[test]
    fn test_reserved_username() {
        let cmd = CreateUserCmd::try_parse_from([
            "create-user",
            "-u",
            "me",
            "-e",
            "me@example.com",
        ])
        .unwrap();
        assert!(cmd.new_user().validate().is_err());
    }
}
