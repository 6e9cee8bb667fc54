//! 已购装备仓储
//!
//! fighter_equipment 行的读写；目录装备查询见 CatalogRepository

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{EquipmentHolder, EquipmentType, FighterEquipment};

const OWNED_COLUMNS: &str = r#"
    id, gang_id, fighter_id, vehicle_id, gang_stash, equipment_id, custom_equipment_id,
    equipment_name, equipment_type, purchase_cost, original_cost, user_id, created_at
"#;

/// 新购入装备
#[derive(Debug, Clone)]
pub struct NewFighterEquipment {
    pub gang_id: Uuid,
    pub holder: EquipmentHolder,
    pub equipment_id: Option<Uuid>,
    pub custom_equipment_id: Option<Uuid>,
    pub equipment_name: String,
    pub equipment_type: EquipmentType,
    pub purchase_cost: i32,
    pub original_cost: i32,
    pub user_id: Uuid,
}

/// 已购装备仓储
pub struct EquipmentRepository {
    pool: PgPool,
}

impl EquipmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_owned(&self, id: Uuid) -> Result<Option<FighterEquipment>> {
        let sql = format!("SELECT {OWNED_COLUMNS} FROM fighter_equipment WHERE id = $1");
        let item = sqlx::query_as::<_, FighterEquipment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn list_for_fighter(&self, fighter_id: Uuid) -> Result<Vec<FighterEquipment>> {
        let sql = format!(
            "SELECT {OWNED_COLUMNS} FROM fighter_equipment WHERE fighter_id = $1 ORDER BY created_at"
        );
        let items = sqlx::query_as::<_, FighterEquipment>(&sql)
            .bind(fighter_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn list_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<FighterEquipment>> {
        let sql = format!(
            "SELECT {OWNED_COLUMNS} FROM fighter_equipment WHERE vehicle_id = $1 ORDER BY created_at"
        );
        let items = sqlx::query_as::<_, FighterEquipment>(&sql)
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取已购装备（带行级锁）
    pub async fn get_owned_for_update(
        tx: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<FighterEquipment>> {
        let sql = format!("SELECT {OWNED_COLUMNS} FROM fighter_equipment WHERE id = $1 FOR UPDATE");
        let item = sqlx::query_as::<_, FighterEquipment>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(item)
    }

    /// 在事务中写入已购装备
    pub async fn insert_in_tx(
        tx: &mut PgConnection,
        item: &NewFighterEquipment,
    ) -> Result<FighterEquipment> {
        let (fighter_id, vehicle_id, stash) = holder_columns(item.holder);
        let sql = format!(
            r#"
            INSERT INTO fighter_equipment (
                gang_id, fighter_id, vehicle_id, gang_stash, equipment_id, custom_equipment_id,
                equipment_name, equipment_type, purchase_cost, original_cost, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {OWNED_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FighterEquipment>(&sql)
            .bind(item.gang_id)
            .bind(fighter_id)
            .bind(vehicle_id)
            .bind(stash)
            .bind(item.equipment_id)
            .bind(item.custom_equipment_id)
            .bind(&item.equipment_name)
            .bind(item.equipment_type)
            .bind(item.purchase_cost)
            .bind(item.original_cost)
            .bind(item.user_id)
            .fetch_one(&mut *tx)
            .await?;

        Ok(row)
    }

    /// 在事务中变更装备持有者
    pub async fn move_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
        holder: EquipmentHolder,
    ) -> Result<FighterEquipment> {
        let (fighter_id, vehicle_id, stash) = holder_columns(holder);
        let sql = format!(
            r#"
            UPDATE fighter_equipment
            SET fighter_id = $2, vehicle_id = $3, gang_stash = $4
            WHERE id = $1
            RETURNING {OWNED_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FighterEquipment>(&sql)
            .bind(id)
            .bind(fighter_id)
            .bind(vehicle_id)
            .bind(stash)
            .fetch_one(&mut *tx)
            .await?;

        Ok(row)
    }

    /// 在事务中删除已购装备（附带效果与异兽关联由外键级联删除）
    pub async fn delete_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fighter_equipment WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// 持有者映射到 (fighter_id, vehicle_id, gang_stash) 三列
fn holder_columns(holder: EquipmentHolder) -> (Option<Uuid>, Option<Uuid>, bool) {
    match holder {
        EquipmentHolder::Fighter(id) => (Some(id), None, false),
        EquipmentHolder::Vehicle(id) => (None, Some(id), false),
        EquipmentHolder::Stash => (None, None, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_columns_exactly_one_owner() {
        let id = Uuid::new_v4();
        for holder in [
            EquipmentHolder::Fighter(id),
            EquipmentHolder::Vehicle(id),
            EquipmentHolder::Stash,
        ] {
            let (f, v, s) = holder_columns(holder);
            let owners = usize::from(f.is_some()) + usize::from(v.is_some()) + usize::from(s);
            assert_eq!(owners, 1, "holder {:?}", holder);
        }
    }
}
