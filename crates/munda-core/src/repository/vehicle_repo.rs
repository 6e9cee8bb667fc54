//! 载具仓储

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Vehicle, VehicleStats};

const VEHICLE_COLUMNS: &str = r#"
    id, gang_id, fighter_id, user_id, vehicle_type_id, vehicle_type, vehicle_name, cost,
    movement, front, side, rear, hull_points, handling, save, created_at, updated_at
"#;

/// 新建载具
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub gang_id: Uuid,
    pub user_id: Uuid,
    pub vehicle_type_id: Option<Uuid>,
    pub vehicle_type: String,
    pub vehicle_name: String,
    pub cost: i32,
    pub stats: VehicleStats,
}

/// 载具仓储
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_vehicle(&self, id: Uuid) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
        let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    pub async fn list_by_gang(&self, gang_id: Uuid) -> Result<Vec<Vehicle>> {
        let sql =
            format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE gang_id = $1 ORDER BY created_at");
        let vehicles = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(gang_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }

    pub async fn list_by_fighter(&self, fighter_id: Uuid) -> Result<Vec<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE fighter_id = $1");
        let vehicles = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(fighter_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取载具（带行级锁）
    pub async fn get_for_update(tx: &mut PgConnection, id: Uuid) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1 FOR UPDATE");
        let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(vehicle)
    }

    /// 在事务中获取战士驾驶的载具
    pub async fn get_by_fighter_in_tx(
        tx: &mut PgConnection,
        fighter_id: Uuid,
    ) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE fighter_id = $1");
        let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(fighter_id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(vehicle)
    }

    pub async fn create_in_tx(tx: &mut PgConnection, new_vehicle: &NewVehicle) -> Result<Vehicle> {
        let sql = format!(
            r#"
            INSERT INTO vehicles (
                gang_id, user_id, vehicle_type_id, vehicle_type, vehicle_name, cost,
                movement, front, side, rear, hull_points, handling, save
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {VEHICLE_COLUMNS}
            "#
        );
        let s = &new_vehicle.stats;
        let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(new_vehicle.gang_id)
            .bind(new_vehicle.user_id)
            .bind(new_vehicle.vehicle_type_id)
            .bind(&new_vehicle.vehicle_type)
            .bind(&new_vehicle.vehicle_name)
            .bind(new_vehicle.cost)
            .bind(s.movement)
            .bind(s.front)
            .bind(s.side)
            .bind(s.rear)
            .bind(s.hull_points)
            .bind(s.handling)
            .bind(s.save)
            .fetch_one(&mut *tx)
            .await?;
        Ok(vehicle)
    }

    /// 在事务中设置驾驶员（None 表示取消分配）
    pub async fn set_crew_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
        fighter_id: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query("UPDATE vehicles SET fighter_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(fighter_id)
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    /// 在事务中取消某战士驾驶的全部载具，返回受影响的载具 ID
    pub async fn unassign_fighter_in_tx(
        tx: &mut PgConnection,
        fighter_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE vehicles
            SET fighter_id = NULL, updated_at = NOW()
            WHERE fighter_id = $1
            RETURNING id
            "#,
        )
        .bind(fighter_id)
        .fetch_all(&mut *tx)
        .await?;
        Ok(ids)
    }

    pub async fn rename_in_tx(tx: &mut PgConnection, id: Uuid, name: &str) -> Result<Vehicle> {
        let sql = format!(
            r#"
            UPDATE vehicles SET vehicle_name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {VEHICLE_COLUMNS}
            "#
        );
        let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        Ok(vehicle)
    }

    /// 在事务中删除载具（载具装备与效果由外键级联删除）
    pub async fn delete_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
