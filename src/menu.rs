//! Interactive wallet menu
//!
//! Drives the core subsystems from stdin prompts. All destructive
//! actions are gated on exact confirmation literals; any other input
//! cancels the action rather than erroring.

use std::io::{self, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use rust_decimal::Decimal;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::keygen::Keypair;
use crate::ledger::{
    self, LedgerClient, ACCOUNT_DELETE_CONFIRMATION, ACCOUNT_DELETE_FEE_XRP, BASE_RESERVE_XRP,
    OWNER_RESERVE_XRP,
};
use crate::search::{
    resolve_worker_count, CancellationToken, SearchCoordinator, SearchOutcome, SearchRequest,
};
use crate::settings::{FrequentAddress, Settings};
use crate::txlog::{TxLog, TxLogEntry};
use crate::wallet::{
    EncryptionService, KeyDerivation, WalletStore, DELETE_ALL_CONFIRMATION, DELETE_CONFIRMATION,
};

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Wrong passwords tolerated before falling back to manual entry.
const PASSWORD_ATTEMPTS: u32 = 3;
/// Entries shown by the transaction log viewer.
const TXLOG_VIEW_LIMIT: usize = 20;

pub async fn run(config: Config) -> Result<()> {
    let mut menu = Menu::new(config);
    menu.main_loop().await
}

/// Ask for a password twice and save the secret into the next free slot.
/// Declining or mismatching passwords cancels without error.
pub fn offer_save(store: &WalletStore, secret: &str) -> Result<()> {
    let save = prompt("Save this wallet encrypted to disk? (y/N): ")?;
    if !save.eq_ignore_ascii_case("y") {
        return Ok(());
    }
    let password = rpassword::prompt_password("Set a password to encrypt your wallet: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        println!("Passwords do not match. Wallet not saved.");
        return Ok(());
    }
    let path = store.save(secret, &password)?;
    println!("Wallet secret encrypted and saved to {}.", path.display());
    Ok(())
}

struct Menu {
    config: Config,
    settings: Settings,
    store: WalletStore,
    txlog: TxLog,
    ledger: LedgerClient,
    wallet: Option<Keypair>,
}

impl Menu {
    fn new(config: Config) -> Self {
        let settings = Settings::load(&config.settings_path());
        let store = WalletStore::new(config.wallets_dir(), encryption_service(&settings));
        let txlog = TxLog::new(config.txlog_path());
        let ledger = LedgerClient::new(&config);
        Self {
            config,
            settings,
            store,
            txlog,
            ledger,
            wallet: None,
        }
    }

    async fn main_loop(&mut self) -> Result<()> {
        println!("{}", "/clawlet/ CLI Wallet".bold());
        loop {
            println!("\nMenu:");
            println!("1. Load existing wallet");
            println!("2. Send XRP to an address");
            println!("3. Send XRP to a saved address");
            println!("4. Show wallet balance and address");
            println!("5. Create new wallet (random fresh address)");
            println!("6. Settings");
            println!("q. Exit");

            match prompt("Select an option (or 'q' to quit): ")?.to_lowercase().as_str() {
                "1" => self.load_wallet()?,
                "2" => self.send_manual().await?,
                "3" => self.send_saved().await?,
                "4" => self.show_balance().await,
                "5" => self.create_wallet()?,
                "6" => self.settings_menu().await?,
                "vanity" => self.vanity_search().await?,
                "q" | "quit" => {
                    println!("Goodbye!");
                    return Ok(());
                }
                _ => println!("Invalid option."),
            }
        }
    }

    fn create_wallet(&mut self) -> Result<()> {
        let keypair = Keypair::generate();
        println!("\nAddress: {}", keypair.address.bold());
        println!("Secret:  {}", keypair.secret);
        println!(
            "\n{} every account needs a {} XRP reserve before it can do anything \
             else, and that reserve stays locked until the account is deleted.",
            "Caution:".yellow().bold(),
            BASE_RESERVE_XRP
        );
        offer_save(&self.store, &keypair.secret)?;
        self.wallet = Some(keypair);
        Ok(())
    }

    fn load_wallet(&mut self) -> Result<()> {
        let files = self.store.list()?;
        println!("\nWallet files in your wallets directory:");
        if files.is_empty() {
            println!("  (none found)");
        }
        for (index, descriptor) in files.iter().enumerate() {
            println!("  {}. {}", index + 1, descriptor.file_name());
        }
        println!("m. Manual secret entry");
        println!("b. Back/cancel");

        let choice = prompt("Select wallet file to load (number, 'm' for manual, 'b' to cancel): ")?
            .to_lowercase();
        let selected = match choice.as_str() {
            "b" => return Ok(()),
            "m" => None,
            // Bare Enter loads the most recent file, like it always has.
            "" if !files.is_empty() => Some(files[0].path.clone()),
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 && n <= files.len() => Some(files[n - 1].path.clone()),
                _ => {
                    println!("Invalid selection.");
                    return Ok(());
                }
            },
        };

        if let Some(path) = selected {
            for attempt in 1..=PASSWORD_ATTEMPTS {
                let password = rpassword::prompt_password("Enter password to decrypt wallet: ")?;
                match self.store.load(&path, &password) {
                    Ok(secret) => match Keypair::from_secret(&secret) {
                        Ok(keypair) => {
                            println!("Loaded wallet address: {}", keypair.address.bold());
                            self.wallet = Some(keypair);
                            return Ok(());
                        }
                        Err(err) => {
                            println!("Wallet file decrypted but holds an unusable secret: {err}");
                            break;
                        }
                    },
                    Err(Error::Authentication) => {
                        println!("Incorrect password ({attempt}/{PASSWORD_ATTEMPTS}).");
                    }
                    Err(err) => {
                        println!("Error loading wallet: {err}");
                        break;
                    }
                }
            }
            println!("Failed to load wallet from file.");
        }

        // Manual fallback
        let secret = prompt("Enter your wallet secret (or press Enter to cancel): ")?;
        if secret.is_empty() {
            return Ok(());
        }
        match Keypair::from_secret(&secret) {
            Ok(keypair) => {
                println!("Loaded wallet address: {}", keypair.address.bold());
                offer_save(&self.store, &keypair.secret)?;
                self.wallet = Some(keypair);
            }
            Err(err) => println!("Error loading wallet: {err}"),
        }
        Ok(())
    }

    async fn show_balance(&self) {
        let Some(wallet) = &self.wallet else {
            println!("No wallet loaded.");
            return;
        };
        match self.ledger.query_account(&wallet.address).await {
            Ok(state) => {
                println!("\nBalance for {}: {} XRP", wallet.address, state.balance_xrp());
                println!("Spendable (above base reserve): {} XRP", state.spendable_xrp());
            }
            Err(err) => println!("Error getting balance: {err:#}"),
        }
        println!("Wallet address: {}", wallet.address.bold());
    }

    async fn vanity_search(&mut self) -> Result<()> {
        let raw = prompt("Enter desired address prefix (e.g. rCAT, 'q' to cancel): ")?;
        if raw.is_empty() || raw.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        let prefix = if raw.starts_with('r') { raw } else { format!("r{raw}") };
        let case_sensitive = prompt("Case sensitive match? (y/N): ")?.eq_ignore_ascii_case("y");

        let request = SearchRequest {
            prefix: prefix.clone(),
            case_sensitive,
            worker_count: 0,
            max_attempts_per_worker: None,
        };
        let workers = resolve_worker_count(request.worker_count);
        let case_text = if case_sensitive { "case-sensitive" } else { "case-insensitive" };
        println!(
            "Searching for an address beginning with '{prefix}...' ({case_text}) \
             using {workers} threads; press Ctrl-C to stop."
        );

        let token = CancellationToken::new();
        let outcome = match run_search(request, token).await {
            Ok(outcome) => outcome,
            Err(Error::InvalidPrefix(reason)) => {
                println!("Invalid prefix: {reason}");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        match outcome {
            SearchOutcome::Found(result) => {
                println!(
                    "\nFound {}\nBy worker {} after {} attempts",
                    result.address.bold(),
                    result.worker_id,
                    result.attempts
                );
                println!(
                    "Time: {:.2}s | Rate: ~{:.0} attempts/sec",
                    result.elapsed_seconds,
                    result.estimated_rate(workers)
                );
                println!("Secret: {}", result.secret);
                offer_save(&self.store, &result.secret)?;
            }
            SearchOutcome::NotFound => println!("Vanity address not found within max attempts."),
            SearchOutcome::Cancelled => println!("\nVanity search cancelled."),
        }
        Ok(())
    }

    async fn send_manual(&mut self) -> Result<()> {
        let Some(wallet) = self.wallet.clone() else {
            println!("No wallet loaded.");
            return Ok(());
        };

        println!("\nSend XRP to an address:");
        let destination = prompt("Destination address (or 'q' to cancel): ")?;
        if destination.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        if !ledger::is_valid_address(&destination) {
            println!("Invalid destination address.");
            return Ok(());
        }

        let advisory = self.ledger.tag_required_accounts().await;
        let requires_tag = advisory.contains(&destination);
        if requires_tag && !self.settings.never_require_tag {
            println!(
                "\n{} '{destination}' is on the list of accounts that need a destination \
                 tag to credit your payment (exchanges, custodial services) even though \
                 the ledger flag is not set.",
                "IMPORTANT:".yellow().bold()
            );
        }

        let mut destination_tag = None;
        if !self.settings.never_require_tag {
            let tag_input = prompt("Destination tag if required (press Enter to skip): ")?;
            if tag_input.eq_ignore_ascii_case("q") {
                return Ok(());
            }
            if !tag_input.is_empty() {
                if tag_input == "forced" && requires_tag {
                    println!(
                        "Override: proceeding WITHOUT a destination tag although this \
                         address is known to require one. Be sure you know where this is going."
                    );
                } else {
                    match tag_input.parse::<u32>() {
                        Ok(tag) => {
                            if !self.tag_sanity_check(tag)? {
                                return Ok(());
                            }
                            destination_tag = Some(tag);
                        }
                        Err(_) => {
                            println!("Invalid destination tag. Must be a number or 'forced'.");
                            return Ok(());
                        }
                    }
                }
            } else if requires_tag {
                println!(
                    "You did not enter a destination tag, but the recipient is known to \
                     require one. Enter the override word 'forced' as the tag, or enable \
                     'never require tag' in settings, if you really mean it."
                );
                return Ok(());
            }
        }

        self.preview_spendable(&wallet.address).await;

        let amount_input = prompt("Amount in XRP: ")?;
        if amount_input.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        let amount: Decimal = match amount_input.parse() {
            Ok(amount) => amount,
            Err(_) => {
                println!("Invalid amount.");
                return Ok(());
            }
        };

        println!("\nSending {amount} XRP to {destination}");
        if let Some(tag) = destination_tag {
            println!("Destination tag: {tag}");
        } else if requires_tag {
            println!("Proceeding WITHOUT a destination tag (override).");
        }
        if prompt("Confirm transaction? (y/n): ")?.eq_ignore_ascii_case("y") {
            self.submit_payment(&wallet, &destination, amount, destination_tag).await;
        } else {
            println!("Transaction cancelled.");
        }
        Ok(())
    }

    async fn send_saved(&mut self) -> Result<()> {
        let Some(wallet) = self.wallet.clone() else {
            println!("No wallet loaded.");
            return Ok(());
        };
        if self.settings.frequent_addresses.is_empty() {
            println!("No saved addresses found.");
            return Ok(());
        }

        println!("\nSend XRP to a saved address:");
        print_frequent_addresses(&self.settings.frequent_addresses);
        println!("b. Back");
        let choice = prompt("Select address to use (number): ")?.to_lowercase();
        if choice == "b" {
            return Ok(());
        }
        let entry = match choice.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.settings.frequent_addresses.len() => {
                self.settings.frequent_addresses[n - 1].clone()
            }
            _ => {
                println!("Invalid selection.");
                return Ok(());
            }
        };

        let mut destination_tag = None;
        if !entry.tags.is_empty() {
            println!("Available tags for this address:");
            for (index, tag) in entry.tags.iter().enumerate() {
                println!("  {}. {tag}", index + 1);
            }
            println!("  o. Other (enter a custom tag)");
            let tag_choice =
                prompt("Select a tag by number, 'o' for a custom tag, or press Enter to skip: ")?;
            if !tag_choice.is_empty() {
                if tag_choice.eq_ignore_ascii_case("o") {
                    match prompt("Enter custom destination tag: ")?.parse::<u32>() {
                        Ok(tag) => destination_tag = Some(tag),
                        Err(_) => {
                            println!("Invalid custom tag.");
                            return Ok(());
                        }
                    }
                } else {
                    match tag_choice.parse::<usize>() {
                        Ok(n) if n >= 1 && n <= entry.tags.len() => {
                            destination_tag = Some(entry.tags[n - 1]);
                        }
                        _ => {
                            println!("Invalid tag selection.");
                            return Ok(());
                        }
                    }
                }
            }
        }

        self.preview_spendable(&wallet.address).await;

        let amount_input = prompt("Amount in XRP: ")?;
        if amount_input.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        let amount: Decimal = match amount_input.parse() {
            Ok(amount) => amount,
            Err(_) => {
                println!("Invalid amount.");
                return Ok(());
            }
        };

        println!("\nSending {amount} XRP to {} ({})", entry.address, entry.nickname);
        if let Some(tag) = destination_tag {
            println!("Destination tag: {tag}");
        }
        if prompt("Confirm transaction? (y/n): ")?.eq_ignore_ascii_case("y") {
            self.submit_payment(&wallet, &entry.address, amount, destination_tag).await;
        } else {
            println!("Transaction cancelled.");
        }
        Ok(())
    }

    async fn preview_spendable(&self, address: &str) {
        match self.ledger.query_account(address).await {
            Ok(state) => println!("Spendable balance: {} XRP", state.spendable_xrp()),
            Err(err) => println!("Could not fetch balance: {err:#}"),
        }
    }

    async fn submit_payment(
        &self,
        wallet: &Keypair,
        destination: &str,
        amount: Decimal,
        destination_tag: Option<u32>,
    ) {
        if self.settings.debug {
            println!(
                "DEBUG: submitting payment from={} to={destination} amount={amount} tag={destination_tag:?}",
                wallet.address
            );
        }
        let entry = TxLogEntry::payment(destination, amount, destination_tag);
        match self
            .ledger
            .submit_payment(&wallet.secret, destination, amount, destination_tag)
            .await
        {
            Ok(submit) => {
                if submit.success {
                    println!("{}", "Transaction successful!".green().bold());
                } else {
                    println!("Transaction failed: {}", submit.engine_result);
                }
                if let Some(hash) = &submit.hash {
                    println!("Hash: {hash}");
                }
                println!("Result: {}", submit.engine_result);
                self.log_tx(entry.with_result(&submit.engine_result, submit.hash));
            }
            Err(err) => {
                println!("Error sending XRP: {err:#}");
                self.log_tx(entry.with_error(&format!("{err:#}")));
            }
        }
    }

    fn log_tx(&self, entry: TxLogEntry) {
        if !self.settings.tx_log_enabled {
            return;
        }
        if let Err(err) = self.txlog.append(entry) {
            warn!(error = %err, "could not log transaction");
        }
    }

    fn tag_sanity_check(&self, tag: u32) -> Result<bool> {
        if !self.settings.sanity_check_tag || !self.settings.frequent_addresses.is_empty() {
            return Ok(true);
        }
        if tag == 0 {
            println!(
                "Note: tag 0 is valid and usable for non-custodial wallets, but double \
                 check that it is intended."
            );
        }
        if tag > 1_000_000 {
            println!("{} destination tag is very large. Double check!", "Warning:".yellow());
        }
        Ok(prompt("Proceed anyway? (y/n): ")?.eq_ignore_ascii_case("y"))
    }

    async fn settings_menu(&mut self) -> Result<()> {
        loop {
            println!("\nSettings Menu:");
            println!("1. Manage frequent addresses");
            println!("2. Toggle 'never require tag' (currently: {})", on_off(self.settings.never_require_tag));
            println!("3. Toggle destination tag sanity check (currently: {})", on_off(self.settings.sanity_check_tag));
            println!("4. Toggle transaction log (currently: {})", on_off(self.settings.tx_log_enabled));
            println!("5. View transaction log");
            println!("6. Delete wallet file (dangerous!)");
            println!("7. Delete ledger account (permanently, send reserve) [DANGEROUS!]");
            println!("8. Toggle hardened wallet encryption (currently: {})", on_off(self.settings.hardened_encryption));
            println!("9. Toggle debug output (currently: {})", on_off(self.settings.debug));
            println!("d. Show build and path details");
            println!("b. Back to main menu");

            match prompt("Select a settings option: ")?.to_lowercase().as_str() {
                "1" => self.manage_frequent_addresses()?,
                "2" => {
                    self.settings.never_require_tag = !self.settings.never_require_tag;
                    self.save_settings();
                }
                "3" => {
                    self.settings.sanity_check_tag = !self.settings.sanity_check_tag;
                    self.save_settings();
                }
                "4" => {
                    self.settings.tx_log_enabled = !self.settings.tx_log_enabled;
                    self.save_settings();
                }
                "5" => self.show_txlog(),
                "6" => self.delete_wallet_files()?,
                "7" => self.account_delete_flow().await?,
                "8" => {
                    self.settings.hardened_encryption = !self.settings.hardened_encryption;
                    self.save_settings();
                    // New saves pick up the mode; old records still decrypt.
                    self.store =
                        WalletStore::new(self.config.wallets_dir(), encryption_service(&self.settings));
                }
                "9" => {
                    self.settings.debug = !self.settings.debug;
                    self.save_settings();
                }
                "d" => self.show_dev_info(),
                "b" => return Ok(()),
                _ => println!("Invalid option."),
            }
        }
    }

    fn save_settings(&self) {
        if let Err(err) = self.settings.save(&self.config.settings_path()) {
            warn!(error = %err, "could not save settings");
            println!("Warning: could not save settings: {err:#}");
        }
    }

    fn manage_frequent_addresses(&mut self) -> Result<()> {
        loop {
            println!("\nFrequent Addresses:");
            if self.settings.frequent_addresses.is_empty() {
                println!("  (none)");
            } else {
                print_frequent_addresses(&self.settings.frequent_addresses);
            }
            println!("a. Add new address");
            println!("e. Edit address");
            println!("d. Delete address");
            println!("b. Back");

            match prompt("Select: ")?.to_lowercase().as_str() {
                "a" => {
                    let nickname = prompt("Enter nickname: ")?;
                    let address = prompt("Enter address: ")?;
                    if !ledger::is_valid_address(&address) {
                        println!("Invalid address.");
                        continue;
                    }
                    let tags = parse_tags(&prompt("Enter tags (comma separated, or leave blank): ")?);
                    self.settings.frequent_addresses.push(FrequentAddress { nickname, address, tags });
                    self.save_settings();
                    println!("Address added.");
                }
                "e" => {
                    let index = match self.select_frequent_index()? {
                        Some(index) => index,
                        None => continue,
                    };
                    let entry = &mut self.settings.frequent_addresses[index];
                    println!("Editing {} - {}", entry.nickname, entry.address);
                    let nickname = prompt(&format!("New nickname (or Enter to keep '{}'): ", entry.nickname))?;
                    let address = prompt(&format!("New address (or Enter to keep '{}'): ", entry.address))?;
                    let tags = prompt("New tags (comma separated, or Enter to keep current): ")?;
                    if !nickname.is_empty() {
                        entry.nickname = nickname;
                    }
                    if !address.is_empty() {
                        if ledger::is_valid_address(&address) {
                            entry.address = address;
                        } else {
                            println!("Invalid address, keeping the old one.");
                        }
                    }
                    if !tags.is_empty() {
                        entry.tags = parse_tags(&tags);
                    }
                    self.save_settings();
                    println!("Address updated.");
                }
                "d" => {
                    let index = match self.select_frequent_index()? {
                        Some(index) => index,
                        None => continue,
                    };
                    let entry = self.settings.frequent_addresses[index].clone();
                    let confirm = prompt(&format!("Delete {} ({})? (y/N): ", entry.nickname, entry.address))?;
                    if confirm.eq_ignore_ascii_case("y") {
                        self.settings.frequent_addresses.remove(index);
                        self.save_settings();
                        println!("Deleted.");
                    }
                }
                "b" => return Ok(()),
                _ => println!("Invalid option."),
            }
        }
    }

    fn select_frequent_index(&self) -> Result<Option<usize>> {
        let input = prompt("Enter number: ")?;
        match input.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.settings.frequent_addresses.len() => Ok(Some(n - 1)),
            _ => {
                println!("Invalid selection.");
                Ok(None)
            }
        }
    }

    fn show_txlog(&self) {
        let entries = self.txlog.recent(TXLOG_VIEW_LIMIT);
        if entries.is_empty() {
            println!("Transaction log is empty.");
            return;
        }
        println!("\nTransaction Log:");
        for entry in entries {
            let amount = entry
                .amount_xrp
                .map(|a| a.to_string())
                .unwrap_or_else(|| "?".to_string());
            let tag = entry
                .destination_tag
                .map(|t| format!(" (tag: {t})"))
                .unwrap_or_default();
            let kind = if entry.account_delete { "Account delete," } else { "Sent" };
            println!(
                "- {}: {kind} {amount} XRP to {}{tag} Result: {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.destination,
                entry.result
            );
        }
    }

    fn delete_wallet_files(&mut self) -> Result<()> {
        println!("{}", "Danger! This deletes wallet files from disk.".red());
        let files = self.store.list()?;
        if files.is_empty() {
            println!("No wallet file found to delete.");
            return Ok(());
        }
        println!("Wallet files in your wallets directory:");
        for (index, descriptor) in files.iter().enumerate() {
            println!("  {}. {}", index + 1, descriptor.file_name());
        }
        println!("a. All wallet files");
        println!("b. Back");

        let choice = prompt("Select wallet file to delete (number, 'a' for all, 'b' to cancel): ")?
            .to_lowercase();
        match choice.as_str() {
            "b" => Ok(()),
            "a" => {
                let confirm = prompt(&format!(
                    "Are you sure you want to DELETE ALL wallet files? This cannot be undone! \
                     (type '{DELETE_ALL_CONFIRMATION}' to confirm): "
                ))?;
                let removed = self.store.delete_all(&confirm)?;
                if removed > 0 {
                    println!("All wallet files deleted.");
                } else {
                    println!("Deletion cancelled.");
                }
                Ok(())
            }
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 && n <= files.len() => {
                    let descriptor = &files[n - 1];
                    let confirm = prompt(&format!(
                        "Are you sure you want to DELETE '{}'? This cannot be undone! \
                         (type '{DELETE_CONFIRMATION}' to confirm): ",
                        descriptor.file_name()
                    ))?;
                    if confirm == DELETE_CONFIRMATION {
                        self.store.delete(&descriptor.path)?;
                        println!("Wallet file deleted.");
                    } else {
                        println!("Deletion cancelled.");
                    }
                    Ok(())
                }
                _ => {
                    println!("Invalid selection.");
                    Ok(())
                }
            },
        }
    }

    async fn account_delete_flow(&mut self) -> Result<()> {
        println!(
            "\n{} this permanently deletes your ledger account and sends the reserve \
             to another address.",
            "DANGER:".red().bold()
        );
        let Some(wallet) = self.wallet.clone() else {
            println!("No wallet loaded/unlocked. Load your wallet first, then return here.");
            return Ok(());
        };

        let destination = prompt("Destination address to receive the reserve (or 'q' to cancel): ")?;
        if destination.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        if !ledger::is_valid_address(&destination) {
            println!("Invalid destination address.");
            return Ok(());
        }

        let state = match self.ledger.query_account(&wallet.address).await {
            Ok(state) => state,
            Err(err) => {
                println!("Error getting account info: {err:#}");
                return Ok(());
            }
        };
        println!("Account balance: {} XRP", state.balance_xrp());
        println!("Owner objects: {}", state.owner_count);
        println!(
            "Minimum reserve for deletion: {} XRP (base {BASE_RESERVE_XRP} + {OWNER_RESERVE_XRP} \
             per owned object)",
            state.minimum_reserve()
        );
        if state.balance_xrp() < state.minimum_reserve() {
            println!(
                "Insufficient balance to delete the account. Remove owned objects \
                 (trust lines, offers) and try again."
            );
            return Ok(());
        }
        let amount_to_send = state.balance_xrp() - ACCOUNT_DELETE_FEE_XRP;
        println!(
            "Amount to be sent: {amount_to_send} XRP (full balance minus the \
             {ACCOUNT_DELETE_FEE_XRP} XRP deletion fee)"
        );
        println!("Destination for reserve: {destination}");

        let confirm = prompt(&format!("Type '{ACCOUNT_DELETE_CONFIRMATION}' (exactly) to confirm: "))?;
        if confirm != ACCOUNT_DELETE_CONFIRMATION {
            println!("Account deletion cancelled.");
            return Ok(());
        }

        println!("Submitting AccountDelete transaction...");
        let entry = TxLogEntry::account_delete(&destination, Some(amount_to_send));
        match self.ledger.submit_account_delete(&wallet.secret, &destination).await {
            Ok(submit) if submit.success => {
                println!("{}", "AccountDelete transaction successful!".green().bold());
                if let Some(hash) = &submit.hash {
                    println!("Hash: {hash}");
                }
                println!("You may now delete the wallet file from disk if you wish.");
                self.log_tx(entry.with_result(&submit.engine_result, submit.hash));
            }
            Ok(submit) => {
                println!("AccountDelete failed: {}", submit.engine_result);
                self.log_tx(entry.with_result(&submit.engine_result, submit.hash));
            }
            Err(err) => {
                println!("Error during account deletion: {err:#}");
                self.log_tx(entry.with_error(&format!("{err:#}")));
            }
        }
        Ok(())
    }

    fn show_dev_info(&self) {
        println!("\nBuild and paths:");
        println!("clawlet version: {}", env!("CARGO_PKG_VERSION"));
        println!("Data directory: {}", self.config.data_dir.display());
        println!("Wallets directory: {}", self.config.wallets_dir().display());
        println!("Settings file: {}", self.config.settings_path().display());
        println!("Tx log file: {}", self.config.txlog_path().display());
        println!("Ledger endpoints: {}", self.config.endpoints.join(", "));
    }
}

/// Run the blocking search off the async runtime, turning Ctrl-C into an
/// external cancellation of the shared token.
pub async fn run_search(
    request: SearchRequest,
    token: CancellationToken,
) -> Result<SearchOutcome, Error> {
    let search_token = token.clone();
    let mut handle =
        tokio::task::spawn_blocking(move || SearchCoordinator::search(&request, &search_token));
    tokio::select! {
        joined = &mut handle => joined.unwrap_or_else(join_failure),
        _ = tokio::signal::ctrl_c() => {
            token.cancel();
            (&mut handle).await.unwrap_or_else(join_failure)
        }
    }
}

fn join_failure(err: tokio::task::JoinError) -> Result<SearchOutcome, Error> {
    Err(Error::Io(io::Error::other(format!("search task failed: {err}"))))
}

fn encryption_service(settings: &Settings) -> EncryptionService {
    let mode = if settings.hardened_encryption {
        KeyDerivation::Hardened
    } else {
        KeyDerivation::Legacy
    };
    EncryptionService::new(mode)
}

fn print_frequent_addresses(entries: &[FrequentAddress]) {
    for (index, entry) in entries.iter().enumerate() {
        let tags = if entry.tags.is_empty() {
            "none".to_string()
        } else {
            entry.tags.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
        };
        println!("  {}. {} - {} (tags: {tags})", index + 1, entry.nickname, entry.address);
    }
}

fn parse_tags(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().context("could not flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("could not read stdin")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("1, 22,junk, 333"), vec![1, 22, 333]);
        assert_eq!(parse_tags(""), Vec::<u32>::new());
    }
}
