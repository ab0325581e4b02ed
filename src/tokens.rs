use std::collections::HashMap;
use lazy_static::lazy_static;

/// Static metadata for a well-known SPL token.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
    pub mint_address: String,
}

lazy_static! {
    pub static ref SPL_TOKENS: HashMap<String, TokenInfo> = {
        let mut m = HashMap::new();

        m.insert("SOL".to_string(), TokenInfo {
            symbol: "SOL".to_string(),
            decimals: 9,
            mint_address: "So11111111111111111111111111111111111111112".to_string(), // Wrapped SOL
        });
        m.insert("USDC".to_string(), TokenInfo {
            symbol: "USDC".to_string(),
            decimals: 6,
            mint_address: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
        });
        m.insert("USDT".to_string(), TokenInfo {
            symbol: "USDT".to_string(),
            decimals: 6,
            mint_address: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB".to_string(),
        });
        m.insert("RAY".to_string(), TokenInfo {
            symbol: "RAY".to_string(),
            decimals: 6,
            mint_address: "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R".to_string(),
        });
        m.insert("BONK".to_string(), TokenInfo {
            symbol: "BONK".to_string(),
            decimals: 5,
            mint_address: "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263".to_string(),
        });
        m.insert("JUP".to_string(), TokenInfo {
            symbol: "JUP".to_string(),
            decimals: 6,
            mint_address: "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN".to_string(),
        });

        m
    };
}

pub fn get_token_by_symbol(symbol: &str) -> Option<TokenInfo> {
    SPL_TOKENS.get(&symbol.to_uppercase()).cloned()
}

pub fn get_token_by_mint(mint_address: &str) -> Option<TokenInfo> {
    SPL_TOKENS.values().find(|info| info.mint_address == mint_address).cloned()
}

/// Resolve a token identifier (symbol or mint address) to a mint address.
pub fn resolve_mint(identifier: &str) -> Option<String> {
    if let Some(info) = get_token_by_symbol(identifier) {
        return Some(info.mint_address);
    }
    if get_token_by_mint(identifier).is_some() {
        return Some(identifier.to_string());
    }
    None
}

/// Convert a token-unit amount to the mint's base units, flooring.
pub fn to_base_units(amount: f64, decimals: u8) -> u64 {
    (amount * (10_f64).powi(decimals as i32)).floor() as u64
}

/// Convert base units back to token units.
pub fn from_base_units(base_units: u64, decimals: u8) -> f64 {
    (base_units as f64) / (10_f64).powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_unit_conversions_use_decimals() {
        assert_eq!(to_base_units(1.5, 9), 1_500_000_000);
        assert_eq!(to_base_units(0.000001, 6), 1);
        assert_eq!(from_base_units(1_500_000_000, 9), 1.5);
    }

    #[test]
    fn resolves_symbols_case_insensitively() {
        let mint = resolve_mint("usdc").unwrap();
        assert_eq!(mint, "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
    }

    #[test]
    fn resolves_known_mints_to_themselves() {
        let sol_mint = "So11111111111111111111111111111111111111112";
        assert_eq!(resolve_mint(sol_mint).unwrap(), sol_mint);
        assert!(resolve_mint("NOT_A_TOKEN").is_none());
    }

    #[test]
    fn lookup_by_mint_returns_decimals() {
        let info = get_token_by_mint("So11111111111111111111111111111111111111112").unwrap();
        assert_eq!(info.symbol, "SOL");
        assert_eq!(info.decimals, 9);
    }
}
