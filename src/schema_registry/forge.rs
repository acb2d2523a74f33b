use super::{EntitySchema, FieldSchema, SchemaRegistry};
use std::sync::Arc;

fn entity(name: &str, description: &str, fields: &[(&str, &str)]) -> EntitySchema {
    EntitySchema {
        name: name.to_string(),
        description: description.to_string(),
        fields: fields
            .iter()
            .map(|(name, description)| FieldSchema {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    }
}

impl SchemaRegistry {
    /// Built-in schema of the Forge DEX subgraph.
    pub fn forge() -> Self {
        let entities = vec![
            entity(
                "Factory",
                "Overall statistics for the entire DEX",
                &[
                    ("id", "Factory address"),
                    ("poolCount", "Total number of pools"),
                    ("txCount", "Total number of transactions"),
                    ("totalVolumeUSD", "Total volume in USD"),
                    ("totalFeesUSD", "Total fees collected in USD"),
                    ("totalValueLockedUSD", "Total value locked in USD"),
                ],
            ),
            entity(
                "Token",
                "Information about individual tokens",
                &[
                    ("id", "Token address"),
                    ("symbol", "Token symbol"),
                    ("name", "Token name"),
                    ("decimals", "Token decimals"),
                    ("totalSupply", "Total supply of the token"),
                    ("volume", "Trading volume in token units"),
                    ("volumeUSD", "Trading volume in USD"),
                    ("txCount", "Number of transactions involving this token"),
                ],
            ),
            entity(
                "Pool",
                "Information about liquidity pools",
                &[
                    ("id", "Pool address"),
                    ("token0", "Address of the first token in the pair"),
                    ("token1", "Address of the second token in the pair"),
                    ("feeTier", "Fee tier of the pool"),
                    ("liquidity", "Current liquidity in the pool"),
                    ("sqrtPrice", "Square root of the current price"),
                    ("token0Price", "Price of token0 in terms of token1"),
                    ("token1Price", "Price of token1 in terms of token0"),
                    ("volumeUSD", "Total volume in USD"),
                    ("txCount", "Total number of transactions"),
                ],
            ),
            entity(
                "Swap",
                "Individual swap transactions",
                &[
                    ("id", "Unique identifier for the swap"),
                    ("timestamp", "Timestamp of the swap"),
                    ("pool", "Address of the pool where the swap occurred"),
                    ("origin", "Address that initiated the swap"),
                    ("token0", "Address of the first token in the pair"),
                    ("token1", "Address of the second token in the pair"),
                    ("amount0", "Amount of token0 swapped"),
                    ("amount1", "Amount of token1 swapped"),
                    ("amountUSD", "USD value of the swap"),
                ],
            ),
            entity(
                "Position",
                "Liquidity positions held by wallets",
                &[
                    ("id", "Position identifier"),
                    ("owner", "Address of the position owner"),
                    ("pool", "Pool the position provides liquidity to"),
                    ("token0", "Address of the first token in the pair"),
                    ("token1", "Address of the second token in the pair"),
                    ("liquidity", "Liquidity held by the position"),
                    ("depositedToken0", "Total token0 deposited"),
                    ("depositedToken1", "Total token1 deposited"),
                    ("withdrawnToken0", "Total token0 withdrawn"),
                    ("withdrawnToken1", "Total token1 withdrawn"),
                    ("collectedFeesToken0", "Fees collected in token0"),
                    ("collectedFeesToken1", "Fees collected in token1"),
                ],
            ),
            entity(
                "PoolDayData",
                "Daily snapshots of pool activity",
                &[
                    ("id", "Snapshot identifier"),
                    ("date", "Start of the day as a unix timestamp"),
                    ("pool", "Pool the snapshot belongs to"),
                    ("liquidity", "Liquidity at the end of the day"),
                    ("sqrtPrice", "Square root price at the end of the day"),
                    ("token0Price", "Price of token0 in terms of token1"),
                    ("token1Price", "Price of token1 in terms of token0"),
                    ("volumeUSD", "Volume during the day in USD"),
                    ("feesUSD", "Fees collected during the day in USD"),
                    ("tvlUSD", "Total value locked in USD"),
                    ("txCount", "Number of transactions during the day"),
                    ("open", "Opening price of token0"),
                    ("high", "Highest price of token0"),
                    ("low", "Lowest price of token0"),
                    ("close", "Closing price of token0"),
                ],
            ),
        ];

        Self {
            entities: Arc::new(entities),
        }
    }
}
