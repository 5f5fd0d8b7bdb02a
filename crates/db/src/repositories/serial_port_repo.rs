//! Repository for the `serial_ports` table.

use relay_core::types::DbId;
use sqlx::PgPool;

use crate::models::serial_port::SerialPortConfig;

const COLUMNS: &str = "id, equipment_id, board_index, serial_id, label, baud_rate, created_at, updated_at";

/// Provides read access to serial console assignments.
pub struct SerialPortRepo;

impl SerialPortRepo {
    /// Serial consoles of one equipment, ordered by board index.
    pub async fn list_for_equipment(
        pool: &PgPool,
        equipment_id: DbId,
    ) -> Result<Vec<SerialPortConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM serial_ports \
             WHERE equipment_id = $1 \
             ORDER BY board_index ASC"
        );
        sqlx::query_as::<_, SerialPortConfig>(&query)
            .bind(equipment_id)
            .fetch_all(pool)
            .await
    }
}
