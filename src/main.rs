//! bankctl 命令行入口

use anyhow::{bail, Context, Result};
use bank_client::{
    config::AppConfig,
    models::{AuditQuery, KycStatus, PageRequest},
    services::{PendingAction, RateQuote},
    telemetry, ApiError, AppState, OtpChallenge,
};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use secrecy::Secret;
use serde::Serialize;
use std::io::BufRead;

#[derive(Parser)]
#[command(name = "bankctl", version, about = "Command-line client for the banking API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account holder login
    Signup(CredentialArgs),
    /// Sign in and store credentials
    Login(CredentialArgs),
    /// Revoke the refresh token and clear stored credentials
    Logout,
    /// Show the signed-in user
    Me,
    /// Exchange the stored refresh token for a new access token
    Refresh,
    #[command(subcommand)]
    Accounts(AccountCommand),
    #[command(subcommand)]
    Kyc(KycCommand),
    #[command(subcommand)]
    Mfa(MfaCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Args)]
struct CredentialArgs {
    email: String,
    /// Read the password from the first line of stdin (otherwise BANKCTL_PASSWORD)
    #[arg(long)]
    password_stdin: bool,
}

#[derive(Subcommand)]
enum AccountCommand {
    List {
        #[arg(long)]
        user_id: Option<String>,
    },
    Show {
        account_id: String,
    },
    Open {
        currency: String,
    },
    Transactions {
        account_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    Deposit {
        account_id: String,
        amount_minor: i64,
        #[arg(long)]
        otp: Option<String>,
    },
    Withdraw {
        account_id: String,
        amount_minor: i64,
        #[arg(long)]
        otp: Option<String>,
    },
    Convert {
        account_id: String,
        to_currency: String,
        amount_minor: i64,
        /// Indicative rate shown to the user; requires --rate-timestamp
        #[arg(long, requires = "rate_timestamp")]
        rate: Option<f64>,
        #[arg(long)]
        rate_timestamp: Option<DateTime<Utc>>,
        #[arg(long)]
        otp: Option<String>,
    },
    Close {
        account_id: String,
        #[arg(long)]
        otp: Option<String>,
    },
}

#[derive(Subcommand)]
enum KycCommand {
    Status,
    Submit {
        full_name: String,
        country: String,
    },
    /// Staff: set a user's KYC status
    Decide {
        user_id: String,
        status: KycStatus,
    },
}

#[derive(Subcommand)]
enum MfaCommand {
    Setup,
    Enable { otp: String },
}

#[derive(Subcommand)]
enum AdminCommand {
    Users {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        #[arg(long)]
        search: Option<String>,
    },
    User {
        user_id: String,
    },
    ResetTotp {
        user_id: String,
    },
    Audit {
        #[arg(long)]
        actor_id: Option<String>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    ReconcileRun,
    ReconcileStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    telemetry::init_telemetry(&config.logging);

    let state = AppState::from_config(&config)?;

    match run(&state, cli.command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(api_error) = e.downcast_ref::<ApiError>() {
                eprintln!("error: {}", describe(api_error));
                std::process::exit(1);
            }
            Err(e)
        }
    }
}

async fn run(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Signup(args) => {
            let password = read_password(args.password_stdin)?;
            print_json(&state.auth_service.signup(&args.email, &password).await?)
        }
        Command::Login(args) => {
            let password = read_password(args.password_stdin)?;
            print_json(&state.auth_service.login(&args.email, &password).await?)
        }
        Command::Logout => {
            state.auth_service.logout().await?;
            eprintln!("Logged out");
            Ok(())
        }
        Command::Me => print_json(&state.auth_service.me().await?),
        Command::Refresh => {
            state.auth_service.refresh_access_token().await?;
            eprintln!("Access token refreshed");
            Ok(())
        }
        Command::Accounts(cmd) => run_accounts(state, cmd).await,
        Command::Kyc(cmd) => match cmd {
            KycCommand::Status => print_json(&state.kyc_service.status().await?),
            KycCommand::Submit { full_name, country } => {
                print_json(&state.kyc_service.submit(&full_name, &country).await?)
            }
            KycCommand::Decide { user_id, status } => {
                state.kyc_service.set_status(&user_id, status).await?;
                eprintln!("KYC status set to {}", status.as_str());
                Ok(())
            }
        },
        Command::Mfa(cmd) => match cmd {
            MfaCommand::Setup => print_json(&state.mfa_service.totp_setup().await?),
            MfaCommand::Enable { otp } => {
                let enabled = state.mfa_service.totp_enable(&otp).await?;
                eprintln!("Two-factor authentication enabled: {}", enabled);
                Ok(())
            }
        },
        Command::Admin(cmd) => run_admin(state, cmd).await,
    }
}

async fn run_accounts(state: &AppState, cmd: AccountCommand) -> Result<()> {
    let accounts = &state.account_service;
    match cmd {
        AccountCommand::List { user_id } => {
            print_json(&accounts.list_accounts(user_id.as_deref()).await?)
        }
        AccountCommand::Show { account_id } => print_json(&accounts.get_account(&account_id).await?),
        AccountCommand::Open { currency } => print_json(&accounts.open_account(&currency).await?),
        AccountCommand::Transactions {
            account_id,
            page,
            page_size,
        } => print_json(
            &accounts
                .list_transactions(&account_id, PageRequest::new(page, page_size))
                .await?,
        ),
        AccountCommand::Deposit {
            account_id,
            amount_minor,
            otp,
        } => {
            let account = accounts.get_account(&account_id).await?;
            let action = PendingAction::deposit(&account, amount_minor)?;
            confirm(state, &action, otp).await
        }
        AccountCommand::Withdraw {
            account_id,
            amount_minor,
            otp,
        } => {
            let account = accounts.get_account(&account_id).await?;
            let action = PendingAction::withdraw(&account, amount_minor)?;
            confirm(state, &action, otp).await
        }
        AccountCommand::Convert {
            account_id,
            to_currency,
            amount_minor,
            rate,
            rate_timestamp,
            otp,
        } => {
            let account = accounts.get_account(&account_id).await?;
            let quote = match (rate, rate_timestamp) {
                (Some(rate), Some(as_of)) => Some(RateQuote { rate, as_of }),
                _ => None,
            };
            let action = PendingAction::convert(&account, &to_currency, amount_minor, quote)?;
            confirm(state, &action, otp).await
        }
        AccountCommand::Close { account_id, otp } => {
            let account = accounts.get_account(&account_id).await?;
            let action = PendingAction::close(&account)?;
            confirm(state, &action, otp).await
        }
    }
}

/// 提交资金操作；服务端要求验证码时从 stdin 读取一次并用同一幂等键重试
async fn confirm(state: &AppState, action: &PendingAction, otp: Option<String>) -> Result<()> {
    let first = state.account_service.confirm(action, otp.as_deref()).await;
    let outcome = match first {
        Err(e) if e.otp_challenge() == Some(OtpChallenge::Required) && otp.is_none() => {
            eprint!("Authenticator code: ");
            let code = read_line()?;
            state.account_service.confirm(action, Some(&code)).await?
        }
        other => other?,
    };

    match outcome {
        bank_client::services::ActionOutcome::Moved(movement) => print_json(&movement),
        bank_client::services::ActionOutcome::Closed(account) => print_json(&account),
    }
}

async fn run_admin(state: &AppState, cmd: AdminCommand) -> Result<()> {
    let admin = &state.admin_service;
    match cmd {
        AdminCommand::Users {
            page,
            page_size,
            search,
        } => print_json(
            &admin
                .list_users(PageRequest::new(page, page_size), search.as_deref())
                .await?,
        ),
        AdminCommand::User { user_id } => print_json(&admin.user_detail(&user_id).await?),
        AdminCommand::ResetTotp { user_id } => {
            let reset = admin.reset_user_totp(&user_id).await?;
            eprintln!("TOTP reset: {}", reset);
            Ok(())
        }
        AdminCommand::Audit {
            actor_id,
            action,
            from,
            to,
            page,
            page_size,
        } => {
            let query = AuditQuery {
                actor_id,
                action,
                from,
                to,
                page: PageRequest::new(page, page_size),
            };
            print_json(&admin.list_audit(&query).await?)
        }
        AdminCommand::ReconcileRun => print_json(&admin.reconcile_run().await?),
        AdminCommand::ReconcileStatus => print_json(&admin.reconcile_status().await?),
    }
}

fn describe(error: &ApiError) -> String {
    match error.otp_challenge() {
        Some(OtpChallenge::SetupRequired) => {
            "Two-factor authentication must be enabled first (bankctl mfa setup)".to_string()
        }
        Some(OtpChallenge::Required) => "Enter your authenticator code with --otp".to_string(),
        Some(OtpChallenge::Invalid) => "Invalid code. Try again.".to_string(),
        None => error.user_message(),
    }
}

fn read_password(from_stdin: bool) -> Result<Secret<String>> {
    if from_stdin {
        return Ok(Secret::new(read_line()?));
    }
    match std::env::var("BANKCTL_PASSWORD") {
        Ok(password) => Ok(Secret::new(password)),
        Err(_) => bail!("Provide the password via --password-stdin or BANKCTL_PASSWORD"),
    }
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
