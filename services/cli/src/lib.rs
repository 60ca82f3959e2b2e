mod cli;
mod commands;
mod infra;

use shelter_risk::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
