//! Session subcommands.

use clap::Subcommand;

use tundra_client::auth::{Credentials, Registration};
use tundra_client::{ClientError, Storefront};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Register a new account
    Register {
        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the logged-in customer
    Whoami,
}

pub async fn run(storefront: &Storefront, action: AuthAction) -> Result<(), ClientError> {
    match action {
        AuthAction::Login { email, password } => {
            let session = storefront.login(Credentials::new(email, password)).await?;
            let profile = session.profile();
            println!(
                "logged in as {} {} <{}>",
                profile.first_name, profile.last_name, profile.email
            );
        }
        AuthAction::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            let session = storefront
                .register(Registration {
                    first_name,
                    last_name,
                    email,
                    password,
                    phone: None,
                })
                .await?;
            println!("registered {}", session.profile().email);
        }
        AuthAction::Logout => {
            storefront.logout().await;
            println!("logged out");
        }
        AuthAction::Whoami => match storefront.session().current() {
            Some(session) => {
                let profile = session.profile();
                println!("{} {} <{}>", profile.first_name, profile.last_name, profile.email);
            }
            None => println!("not logged in"),
        },
    }
    Ok(())
}
