//! Interface de linha de comando do boxflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (serve, demo)
//! e flags globais (--latency-ms, --verbose).

use clap::{Parser, Subcommand};

/// boxflow: servidor WebSocket de um workflow probabilístico em quatro estágios.
#[derive(Debug, Parser)]
#[command(name = "boxflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Latência simulada de cada tentativa, em milissegundos.
    #[arg(long, global = true)]
    pub latency_ms: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inicia o servidor WebSocket.
    Serve {
        /// Porta de escuta (sobrepõe boxflow.toml e BOXFLOW_PORT).
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Executa um workflow localmente, exibindo o progresso no terminal.
    Demo {
        /// Semente do gerador aleatório, para execuções reproduzíveis.
        #[arg(long)]
        seed: Option<u64>,
    },
}
