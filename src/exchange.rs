//! Per-symbol book actors.
//!
//! ## Architecture
//!
//! ```text
//!   Exchange::submit ──▶ mpsc (BTC-USDT) ──▶ BookActor { OrderBook, MatchingEngine }
//!   Exchange::cancel ──▶ mpsc (ETH-USDT) ──▶ BookActor { OrderBook, MatchingEngine }
//!                  ◀── oneshot reply ──┘
//! ```
//!
//! Each book is owned by exactly one tokio task, which drains its command
//! queue strictly in arrival order. Books for different symbols share
//! nothing and run in parallel.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::{MatchResult, MatchingEngine};
use crate::error::{ConfigError, EngineError};
use crate::orderbook::{DepthSnapshot, OrderBook};
use crate::types::Order;

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Request to a book actor
#[derive(Debug)]
pub enum BookCommand {
    Submit { order: Order, reply: Reply<MatchResult> },
    Cancel { order_id: u64, reply: Reply<bool> },
    BestBid { reply: Reply<Option<Order>> },
    BestAsk { reply: Reply<Option<Order>> },
    LastPrice { reply: Reply<Option<Decimal>> },
    Depth { levels: usize, reply: Reply<DepthSnapshot> },
    StateRoot { reply: Reply<String> },
}

struct BookHandle {
    commands: mpsc::Sender<BookCommand>,
    task: JoinHandle<()>,
}

/// Front door to every configured book
pub struct Exchange {
    books: HashMap<String, BookHandle>,
}

impl Exchange {
    /// Spawn one actor per configured symbol.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when `config` fails [`EngineConfig::validate`]
    /// (no symbols, blank or duplicate symbols, zero channel capacity).
    pub fn start(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let books = config
            .symbols
            .iter()
            .map(|symbol| {
                let (commands, rx) = mpsc::channel(config.channel_capacity);
                let actor = BookActor {
                    book: OrderBook::with_capacity(symbol.clone(), config.book_capacity),
                    engine: MatchingEngine::new(),
                    commands: rx,
                };
                let task = tokio::spawn(actor.run());
                (symbol.clone(), BookHandle { commands, task })
            })
            .collect();

        info!(symbols = ?config.symbols, "exchange started");
        Ok(Self { books })
    }

    /// Symbols with a running book, sorted
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.books.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Validate `order` and match it against its symbol's book
    pub async fn submit(&self, order: Order) -> Result<MatchResult, EngineError> {
        order.validate()?;
        let symbol = order.symbol().to_string();
        self.request(&symbol, |reply| BookCommand::Submit { order, reply })
            .await
    }

    /// `Ok(false)` when the book holds no such order
    pub async fn cancel(&self, symbol: &str, order_id: u64) -> Result<bool, EngineError> {
        self.request(symbol, |reply| BookCommand::Cancel { order_id, reply })
            .await
    }

    pub async fn best_bid(&self, symbol: &str) -> Result<Option<Order>, EngineError> {
        self.request(symbol, |reply| BookCommand::BestBid { reply }).await
    }

    pub async fn best_ask(&self, symbol: &str) -> Result<Option<Order>, EngineError> {
        self.request(symbol, |reply| BookCommand::BestAsk { reply }).await
    }

    pub async fn last_price(&self, symbol: &str) -> Result<Option<Decimal>, EngineError> {
        self.request(symbol, |reply| BookCommand::LastPrice { reply })
            .await
    }

    pub async fn depth(&self, symbol: &str, levels: usize) -> Result<DepthSnapshot, EngineError> {
        self.request(symbol, |reply| BookCommand::Depth { levels, reply })
            .await
    }

    /// Hex state root of the book
    pub async fn state_root(&self, symbol: &str) -> Result<String, EngineError> {
        self.request(symbol, |reply| BookCommand::StateRoot { reply })
            .await
    }

    /// Close every queue and wait for the actors to drain and exit
    pub async fn shutdown(self) {
        for (symbol, handle) in self.books {
            drop(handle.commands);
            if let Err(err) = handle.task.await {
                warn!(symbol = %symbol, error = %err, "book actor did not exit cleanly");
            }
        }
        info!("exchange stopped");
    }

    async fn request<T>(
        &self,
        symbol: &str,
        command: impl FnOnce(Reply<T>) -> BookCommand,
    ) -> Result<T, EngineError> {
        let handle = self
            .books
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        let unavailable = || EngineError::Unavailable {
            symbol: symbol.to_string(),
        };

        let (reply, response) = oneshot::channel();
        handle
            .commands
            .send(command(reply))
            .await
            .map_err(|_| unavailable())?;
        response.await.map_err(|_| unavailable())?
    }
}

struct BookActor {
    book: OrderBook,
    engine: MatchingEngine,
    commands: mpsc::Receiver<BookCommand>,
}

impl BookActor {
    async fn run(mut self) {
        debug!(symbol = %self.book.symbol(), "book actor started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        info!(
            symbol = %self.book.symbol(),
            orders = self.engine.orders_processed(),
            trades = self.engine.trades_executed(),
            "book actor stopped"
        );
    }

    fn handle(&mut self, command: BookCommand) {
        // Replies are dropped when the caller has gone away.
        match command {
            BookCommand::Submit { order, reply } => {
                let result = self.engine.match_order(&mut self.book, order, Utc::now());
                let _ = reply.send(result);
            }
            BookCommand::Cancel { order_id, reply } => {
                let result = self
                    .engine
                    .cancel_order(&mut self.book, order_id)
                    .map(|cancelled| cancelled.is_some());
                let _ = reply.send(result);
            }
            BookCommand::BestBid { reply } => {
                let _ = reply.send(self.query(|book| book.best_bid().cloned()));
            }
            BookCommand::BestAsk { reply } => {
                let _ = reply.send(self.query(|book| book.best_ask().cloned()));
            }
            BookCommand::LastPrice { reply } => {
                let _ = reply.send(self.query(OrderBook::last_price));
            }
            BookCommand::Depth { levels, reply } => {
                let _ = reply.send(self.query(|book| book.depth(levels)));
            }
            BookCommand::StateRoot { reply } => {
                let _ = reply.send(self.query(OrderBook::state_root_hex));
            }
        }
    }

    fn query<T>(&self, read: impl FnOnce(&OrderBook) -> T) -> Result<T, EngineError> {
        if self.book.is_halted() {
            return Err(EngineError::Halted {
                symbol: self.book.symbol().to_string(),
            });
        }
        Ok(read(&self.book))
    }
}
