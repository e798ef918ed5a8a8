//! CLI command implementations.

use crate::AppContext;
use std::io::Write;
use trmp_rpc::{ApiClient, ApiConfig};
use trmp_tx::{parse_transaction, verify_format_with, VerifyOptions};
use trmp_types::address::decode_address_for;
use trmp_types::constants::TICKER;
use trmp_types::format_amount;
use trmp_wallet::encryption::MIN_PASSWORD_LEN;
use trmp_wallet::send::{quote_payment, wallet_address};
use trmp_wallet::{
    balance, change_password, create_vault, decrypt_wallet, generate_mnemonic, plan_outputs,
    send_approved_payment, validate_mnemonic, FeeQuote, PaymentOutput, SendRequest,
    WalletFileData, WalletKeys, WalletSecret,
};

type Result = std::result::Result<(), Box<dyn std::error::Error>>;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn prompt_password(prompt: &str) -> std::result::Result<String, Box<dyn std::error::Error>> {
    let pass = rpassword::prompt_password(prompt)?;
    if pass.is_empty() {
        return Err("password cannot be empty".into());
    }
    Ok(pass)
}

fn prompt_new_password() -> std::result::Result<String, Box<dyn std::error::Error>> {
    let pass = prompt_password("New wallet password: ")?;
    if pass.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("password must be at least {} characters", MIN_PASSWORD_LEN).into());
    }
    let confirm = prompt_password("Confirm password: ")?;
    if pass != confirm {
        return Err("passwords do not match".into());
    }
    Ok(pass)
}

fn confirm(question: &str) -> std::result::Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn api(ctx: &AppContext) -> ApiClient {
    ApiClient::with_config(ApiConfig {
        url: ctx.api_url.clone(),
        ..ApiConfig::for_network(ctx.network)
    })
}

fn load_file(ctx: &AppContext) -> std::result::Result<WalletFileData, Box<dyn std::error::Error>> {
    if !ctx.wallet_path.exists() {
        return Err(format!(
            "wallet file not found: {}\nUse 'create' or 'restore' first, or specify --wallet-file",
            ctx.wallet_path.display()
        )
        .into());
    }
    Ok(WalletFileData::load(&ctx.wallet_path)?)
}

fn open_wallet(ctx: &AppContext) -> std::result::Result<WalletSecret, Box<dyn std::error::Error>> {
    let file = load_file(ctx)?;
    let password = prompt_password("Wallet password: ")?;
    let outcome = decrypt_wallet(&file.data, &password);
    if !outcome.is_success {
        return Err("wrong password or corrupted wallet file".into());
    }
    Ok(outcome.into_result()?)
}

fn save_new_wallet(ctx: &AppContext, mnemonic: &str) -> Result {
    let password = prompt_new_password()?;
    let path = ctx.network.config().derivation_path;
    let blob = create_vault(mnemonic, &password, path)?;
    WalletFileData::new(blob).save(&ctx.wallet_path)?;

    let keys = WalletKeys::derive(mnemonic, path, ctx.network)?;
    println!("Wallet saved: {}", ctx.wallet_path.display());
    println!("Address:      {}", keys.address());
    Ok(())
}

fn refuse_overwrite(ctx: &AppContext) -> Result {
    if ctx.wallet_path.exists() {
        return Err(format!("wallet file already exists: {}", ctx.wallet_path.display()).into());
    }
    Ok(())
}

fn coins(atomic: u64) -> String {
    format!("{} {}", format_amount(atomic), TICKER)
}

fn print_quote(quote: &FeeQuote) {
    println!("Inputs:        {} ({})", quote.picked.len(), coins(quote.picked_total));
    for output in &quote.outputs {
        println!("  To {}  {}", output.address, coins(output.amount));
    }
    println!("Network fee:   {}", coins(quote.network_fee));
    println!("Platform fee:  {}", coins(quote.app_fee));
    println!("Change:        {}", coins(quote.change));
    if quote.forced_deduction {
        println!("Note: inputs leave no change after fees, so the fee is taken");
        println!("from the last recipient that can cover it.");
    } else if quote.deduct_fee_from_amount {
        println!("Fee deducted from recipient amount.");
    }
}

// ─── Commands ───────────────────────────────────────────────────────────────

pub fn create_wallet(ctx: &AppContext) -> Result {
    refuse_overwrite(ctx)?;
    let mnemonic = generate_mnemonic();

    println!("IMPORTANT: Write down your seed phrase and keep it safe!");
    println!("If you lose it, you will lose access to your funds.");
    println!();
    println!("Seed phrase (24 words):");
    println!("  {}", mnemonic.as_str());
    println!();

    save_new_wallet(ctx, &mnemonic)
}

pub fn restore_wallet(ctx: &AppContext) -> Result {
    refuse_overwrite(ctx)?;

    println!("Enter your mnemonic seed phrase:");
    let mut mnemonic = String::new();
    std::io::stdin().read_line(&mut mnemonic)?;
    let mnemonic = trmp_wallet::keys::normalize_mnemonic(&mnemonic);
    validate_mnemonic(&mnemonic)?;

    save_new_wallet(ctx, &mnemonic)
}

pub fn show_address(ctx: &AppContext) -> Result {
    let secret = open_wallet(ctx)?;
    println!("{}", wallet_address(&secret, ctx.network)?);
    Ok(())
}

pub fn show_seed(ctx: &AppContext) -> Result {
    let secret = open_wallet(ctx)?;
    println!("Seed phrase:");
    println!("  {}", secret.mnemonic);
    println!("Derivation path: {}", secret.derivation_path);
    println!();
    println!("WARNING: Never share your seed phrase with anyone!");
    Ok(())
}

pub fn change_wallet_password(ctx: &AppContext) -> Result {
    let mut file = load_file(ctx)?;
    let old = prompt_password("Current password: ")?;
    if !trmp_wallet::verify_password(&file.data, &old) {
        return Err("wrong password".into());
    }
    let new = prompt_new_password()?;
    let blob = change_password(&file.data, &old, &new)?;
    file.replace_data(blob);
    file.save(&ctx.wallet_path)?;
    println!("Password changed.");
    Ok(())
}

pub fn decode(raw_hex: &str) -> Result {
    let raw = hex::decode(raw_hex.trim())?;
    let tx = parse_transaction(&raw)?;
    println!("{}", serde_json::to_string_pretty(&tx.describe())?);
    Ok(())
}

pub fn verify(raw_hex: &str, strict: bool) -> Result {
    let report = verify_format_with(
        raw_hex,
        VerifyOptions {
            strict_script_sig: strict,
        },
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.valid {
        return Err("transaction failed verification".into());
    }
    Ok(())
}

pub async fn quote(
    ctx: &AppContext,
    to: Vec<PaymentOutput>,
    deduct_fee: bool,
    from: Option<String>,
) -> Result {
    let own = match from {
        Some(address) => {
            decode_address_for(&address, ctx.network)?;
            address
        }
        None => wallet_address(&open_wallet(ctx)?, ctx.network)?,
    };
    let request = SendRequest {
        outputs: to,
        deduct_fee_from_amount: deduct_fee,
    };
    let quote = quote_payment(&api(ctx), &own, &request, &ctx.send_config).await?;
    print_quote(&quote);

    let plan = plan_outputs(&quote, &own, ctx.send_config.fee_address())?;
    println!();
    println!("Outputs requested from the template provider:");
    for (address, amount) in &plan {
        println!("  {}  {}", address, coins(*amount));
    }
    Ok(())
}

pub async fn send(ctx: &AppContext, to: Vec<PaymentOutput>, deduct_fee: bool, yes: bool) -> Result {
    let secret = open_wallet(ctx)?;
    let own = wallet_address(&secret, ctx.network)?;
    let client = api(ctx);
    let request = SendRequest {
        outputs: to,
        deduct_fee_from_amount: deduct_fee,
    };

    let preview = quote_payment(&client, &own, &request, &ctx.send_config).await?;
    print_quote(&preview);
    println!();
    if !yes && !confirm("Send this payment?")? {
        println!("Payment cancelled.");
        return Ok(());
    }

    let receipt =
        send_approved_payment(&client, &secret, &request, &ctx.send_config, &preview).await?;
    println!("Transaction sent: {}", receipt.txid);
    Ok(())
}

pub async fn show_balance(ctx: &AppContext, address: Option<String>) -> Result {
    let address = match address {
        Some(address) => {
            decode_address_for(&address, ctx.network)?;
            address
        }
        None => wallet_address(&open_wallet(ctx)?, ctx.network)?,
    };
    let unspent = api(ctx).list_unspent(&address).await?;
    let summary = balance(&unspent);

    println!("Address:   {}", address);
    println!("Balance:   {}", coins(summary.total));
    println!("Spendable: {}", coins(summary.spendable));
    println!("Locked:    {}", coins(summary.locked));
    println!("Outputs:   {}", summary.output_count);
    Ok(())
}

pub async fn show_status(ctx: &AppContext, txid: &str) -> Result {
    let status = api(ctx).transaction_status(txid).await?;
    if status.is_confirmed() {
        println!(
            "{}: confirmed ({} confirmations) in block {}",
            txid,
            status.confirmations.unwrap_or(0),
            status.blockhash.as_deref().unwrap_or_default()
        );
    } else {
        println!("{}: pending", txid);
    }
    Ok(())
}
