//! Configuração do boxflow carregada a partir de `boxflow.toml`.
//!
//! A struct [`BoxflowConfig`] contém os parâmetros do servidor e da latência
//! simulada. Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `BOXFLOW_PORT` tem precedência sobre o arquivo.
//! Número de estágios, faixas e orçamento de retentativas são fixos e não
//! aparecem aqui.

use anyhow::Result;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::BoxflowError;

/// Configuração de nível superior carregada de `boxflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxflowConfig {
    /// Endereço IP onde o servidor escuta.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Porta TCP do servidor WebSocket.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Latência simulada de cada tentativa, em milissegundos.
    #[serde(default = "default_trial_latency_ms")]
    pub trial_latency_ms: u64,

    /// Filtro de log no formato do `EnvFilter` (ex.: "info", "boxflow=debug").
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

// Valor padrão para o endereço: todas as interfaces.
fn default_bind() -> String {
    "0.0.0.0".to_string()
}

// Valor padrão para a porta: 3001.
fn default_port() -> u16 {
    3001
}

// Valor padrão para a latência: 1000ms.
fn default_trial_latency_ms() -> u64 {
    1000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for BoxflowConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            trial_latency_ms: default_trial_latency_ms(),
            log_filter: default_log_filter(),
        }
    }
}

impl BoxflowConfig {
    /// Carrega a configuração de `boxflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new("boxflow.toml"))?;

        // Variável de ambiente tem precedência sobre o arquivo de configuração para a porta.
        config.apply_port_override(std::env::var("BOXFLOW_PORT").ok())?;

        Ok(config)
    }

    // Valor vazio é tratado como ausente, como as demais variáveis opcionais.
    fn apply_port_override(&mut self, value: Option<String>) -> Result<(), BoxflowError> {
        if let Some(port) = value {
            if !port.is_empty() {
                self.port = port
                    .parse()
                    .map_err(|_| BoxflowError::Config(format!("invalid BOXFLOW_PORT: {port}")))?;
            }
        }
        Ok(())
    }

    /// Lê um arquivo específico; ausência do arquivo resulta nos defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str::<BoxflowConfig>(&contents).map_err(BoxflowError::from)?;
        Ok(config)
    }

    /// Endereço completo de escuta, validando o IP configurado.
    pub fn socket_addr(&self) -> Result<SocketAddr, BoxflowError> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|_| BoxflowError::Config(format!("invalid bind address: {}", self.bind)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn trial_latency(&self) -> Duration {
        Duration::from_millis(self.trial_latency_ms)
    }
}
