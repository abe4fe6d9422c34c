use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Trade records table (one row per proposed setup)
        manager
            .create_table(
                Table::create()
                    .table(TradeRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TradeRecords::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TradeRecords::Symbol).string().not_null())
                    .col(ColumnDef::new(TradeRecords::Interval).string().not_null())
                    .col(ColumnDef::new(TradeRecords::Exchange).string().not_null())
                    .col(ColumnDef::new(TradeRecords::Direction).string_len(8).not_null()) // "Long" or "Short"
                    .col(
                        ColumnDef::new(TradeRecords::Status)
                            .string_len(16)
                            .not_null()
                            .default("POTENTIAL"),
                    )
                    .col(ColumnDef::new(TradeRecords::Confidence).integer().not_null())
                    .col(ColumnDef::new(TradeRecords::EntryPrice).double().not_null())
                    .col(ColumnDef::new(TradeRecords::StopLoss).double().not_null())
                    .col(ColumnDef::new(TradeRecords::TakeProfit1).double().null())
                    .col(ColumnDef::new(TradeRecords::TakeProfit2).double().not_null())
                    .col(
                        ColumnDef::new(TradeRecords::IsPartiallyClosed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(TradeRecords::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(TradeRecords::LastProcessedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trade_records_status")
                    .table(TradeRecords::Table)
                    .col(TradeRecords::Status)
                    .to_owned(),
            )
            .await?;

        // Dedup probe: same market/timeframe/direction within a window
        manager
            .create_index(
                Index::create()
                    .name("idx_trade_records_dedup")
                    .table(TradeRecords::Table)
                    .col(TradeRecords::Symbol)
                    .col(TradeRecords::Interval)
                    .col(TradeRecords::Direction)
                    .col(TradeRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Append-only audit trail per trade
        manager
            .create_table(
                Table::create()
                    .table(TradeEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TradeEvents::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TradeEvents::TradeId).big_integer().not_null())
                    .col(ColumnDef::new(TradeEvents::Timestamp).timestamp().not_null())
                    .col(ColumnDef::new(TradeEvents::EventType).string_len(16).not_null())
                    .col(ColumnDef::new(TradeEvents::DetailsJson).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trade_events_trade")
                            .from(TradeEvents::Table, TradeEvents::TradeId)
                            .to(TradeRecords::Table, TradeRecords::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trade_events_trade_id")
                    .table(TradeEvents::Table)
                    .col(TradeEvents::TradeId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TradeEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TradeRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TradeRecords {
    Table,
    Id,
    Symbol,
    Interval,
    Exchange,
    Direction,
    Status,
    Confidence,
    EntryPrice,
    StopLoss,
    #[sea_orm(iden = "take_profit_1")]
    TakeProfit1,
    #[sea_orm(iden = "take_profit_2")]
    TakeProfit2,
    IsPartiallyClosed,
    CreatedAt,
    LastProcessedAt,
}

#[derive(DeriveIden)]
enum TradeEvents {
    Table,
    Id,
    TradeId,
    Timestamp,
    EventType,
    DetailsJson,
}
