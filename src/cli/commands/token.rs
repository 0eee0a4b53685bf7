use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "Subject user id")]
    pub user: Uuid,

    #[arg(long, default_value = "", help = "Display name carried in the token")]
    pub name: String,

    #[arg(long, default_value_t = 24, help = "Lifetime in hours")]
    pub ttl_hours: i64,

    #[arg(long, env = "SECURITY_JWT_SECRET", hide_env_values = true, help = "Signing secret")]
    pub secret: String,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let claims = Claims::new(args.user, args.name, args.ttl_hours);
    let token = generate_jwt(&claims, &args.secret)?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(&output_format, "token issued", Some(json!({ "token": token, "exp": claims.exp }))),
    }
}
