//! Contention Check Tool
//!
//! Fires concurrent withdrawals at one freshly registered customer and
//! verifies the balance never goes negative and matches the ledger.
//!
//! Run with: cargo run --bin contention_check --release -- --workers 20 --deposit 100 --amount 15

use std::time::Instant;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

use virtual_bank::domain::{BankError, EntryType, OperationContext};
use virtual_bank::handlers::{DepositCommand, MoneyMovement, RegisterCommand, WithdrawCommand};
use virtual_bank::{db, PgStore};

fn arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let workers: usize = arg(&args, "--workers", 20);
    let deposit: Decimal = arg(&args, "--deposit", Decimal::from(100));
    let amount: Decimal = arg(&args, "--amount", Decimal::from(15));

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Contention Check - {} workers withdrawing {} from {}", workers, amount, deposit);
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(workers.clamp(2, 50) as u32)
        .connect(&database_url)
        .await?;
    db::apply_schema(&pool).await?;

    let engine = MoneyMovement::new(PgStore::new(pool.clone()));
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let customer = engine
        .directory()
        .register(RegisterCommand::new(
            format!("contention_{}", &tag[..12]),
            format!("contention_{}@example.com", tag),
            "contention".to_string(),
            "Contention".to_string(),
            "Check".to_string(),
        ))
        .await?;
    engine
        .deposit(DepositCommand::new(customer.id, deposit), &OperationContext::new())
        .await?;

    let customer_id = customer.id;
    let start = Instant::now();
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .withdraw(WithdrawCommand::new(customer_id, amount), &OperationContext::new())
                    .await
            })
        })
        .collect();

    let (mut succeeded, mut insufficient, mut conflicts, mut failed) = (0u32, 0u32, 0u32, 0u32);
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(BankError::InsufficientFunds { .. }) => insufficient += 1,
            Err(BankError::Conflict) => conflicts += 1,
            Err(e) => {
                eprintln!("Unexpected failure: {}", e);
                failed += 1;
            }
        }
    }
    let elapsed = start.elapsed();

    let final_balance = engine.directory().get_by_id(customer.id).await?.balance;
    let history = engine.history(customer.id).await?;
    let withdrawals = history
        .iter()
        .filter(|e| e.entry_type == EntryType::Withdrawal)
        .count();
    let expected = deposit - amount * Decimal::from(succeeded);

    println!("\n=== Contention Check Results ===");
    println!("Succeeded: {}", succeeded);
    println!("Insufficient funds: {}", insufficient);
    println!("Conflicts after retries: {}", conflicts);
    println!("Other failures: {}", failed);
    println!("Final balance: {}", final_balance);
    println!("Time: {:.2}s", elapsed.as_secs_f64());

    pool.close().await;

    if final_balance < Decimal::ZERO {
        anyhow::bail!("balance went negative: {}", final_balance);
    }
    if final_balance != expected || withdrawals != succeeded as usize {
        anyhow::bail!(
            "ledger mismatch: balance {} (expected {}), {} withdrawal entries for {} successes",
            final_balance,
            expected,
            withdrawals,
            succeeded
        );
    }

    println!("OK: balance and ledger agree");
    Ok(())
}
