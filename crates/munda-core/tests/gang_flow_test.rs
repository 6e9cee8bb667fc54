//! 帮派完整流程集成测试
//!
//! 使用真实 PostgreSQL 和 Redis 验证资金、评分与日志在同一事务中保持一致。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... REDIS_URL=redis://... \
//!   cargo test -p munda-core --test gang_flow_test -- --ignored
//! ```

use std::sync::Arc;

use fake::Fake;
use fake::faker::name::en::FirstName;

use munda_core::dto::{
    AddFighterRequest, AddVehicleRequest, BuyEquipmentRequest, CreateGangRequest,
    FighterTypeSource, StatusAction,
};
use munda_core::rating::rating_of;
use munda_core::repository::RatingRepositoryTrait;
use munda_core::{
    AccessControl, AccessRepository, EquipmentHolder, EquipmentService, EquipmentSource,
    FighterService, GangChanges, GangService, InjuryService, MundaError, RatingRepository,
    VehicleService,
};
use munda_shared::cache::Cache;
use munda_shared::config::RedisConfig;
use sqlx::PgPool;
use uuid::Uuid;

const STARTING_CREDITS: i32 = 1000;

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

struct Services {
    gangs: GangService,
    fighters: FighterService,
    equipment: EquipmentService,
    vehicles: VehicleService,
    injuries: InjuryService,
}

async fn setup(pool: &PgPool) -> Services {
    let cache = Arc::new(
        Cache::new(&RedisConfig {
            url: redis_url(),
            pool_size: 2,
        })
        .expect("Redis connection failed"),
    );
    let access = Arc::new(AccessControl::new(Arc::new(AccessRepository::new(
        pool.clone(),
    ))));
    Services {
        gangs: GangService::new(pool.clone(), cache.clone(), access.clone(), STARTING_CREDITS),
        fighters: FighterService::new(pool.clone(), cache.clone(), access.clone()),
        equipment: EquipmentService::new(pool.clone(), cache.clone(), access.clone()),
        vehicles: VehicleService::new(pool.clone(), cache.clone(), access.clone()),
        injuries: InjuryService::new(pool.clone(), cache, access),
    }
}

/// 测试数据：用户、帮派类型、一个 100 信用点的战士类型、一件 25 信用点的武器
struct Seed {
    user_id: Uuid,
    gang_type_id: Uuid,
    fighter_type_id: Uuid,
    equipment_id: Uuid,
}

async fn seed(pool: &PgPool) -> Seed {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (id, username) VALUES ($1, $2)")
        .bind(user_id)
        .bind(format!("integ-{}", user_id.simple()))
        .execute(pool)
        .await
        .expect("插入测试用户失败");

    let gang_type_id: Uuid = sqlx::query_scalar(
        "INSERT INTO gang_types (gang_type, alignment) VALUES ($1, 'outlaw') RETURNING id",
    )
    .bind(format!("IntegTest Gang {}", user_id.simple()))
    .fetch_one(pool)
    .await
    .expect("插入帮派类型失败");

    let fighter_type_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO fighter_types (fighter_type, gang_type_id, fighter_class, cost, movement, wounds)
        VALUES ('IntegTest Ganger', $1, 'Ganger', 100, 5, 1)
        RETURNING id
        "#,
    )
    .bind(gang_type_id)
    .fetch_one(pool)
    .await
    .expect("插入战士类型失败");

    let equipment_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO equipment (equipment_name, equipment_category, equipment_type, cost)
        VALUES ('IntegTest Autogun', 'Basic Weapons', 'weapon', 25)
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .expect("插入装备失败");

    Seed {
        user_id,
        gang_type_id,
        fighter_type_id,
        equipment_id,
    }
}

async fn cleanup(pool: &PgPool, seed: &Seed) {
    sqlx::query("DELETE FROM profiles WHERE id = $1")
        .bind(seed.user_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM equipment WHERE id = $1")
        .bind(seed.equipment_id)
        .execute(pool)
        .await
        .ok();
    sqlx::query("DELETE FROM gang_types WHERE id = $1")
        .bind(seed.gang_type_id)
        .execute(pool)
        .await
        .ok();
}

/// 级联流程用的目录数据
struct CascadeSeed {
    /// 40 信用点，购买后生成一只异兽
    beast_equipment_id: Uuid,
    /// 20 信用点，附带一个 +10 费用的效果
    effect_equipment_id: Uuid,
    effect_type_id: Uuid,
    /// 120 信用点的载具
    vehicle_type_id: Uuid,
    /// 使战士被俘的伤病
    captured_injury_id: Uuid,
    /// 不带状态标记的伤病
    plain_injury_id: Uuid,
}

async fn seed_cascade(pool: &PgPool, seed: &Seed) -> CascadeSeed {
    let beast_type_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO fighter_types (fighter_type, gang_type_id, fighter_class, cost, movement, wounds)
        VALUES ('IntegTest Cyber-mastiff', $1, 'Exotic Beast', 0, 7, 1)
        RETURNING id
        "#,
    )
    .bind(seed.gang_type_id)
    .fetch_one(pool)
    .await
    .expect("插入异兽类型失败");

    let beast_equipment_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO equipment (equipment_name, equipment_category, equipment_type, cost, grants_fighter_type_id)
        VALUES ('IntegTest Mastiff Leash', 'Exotic Beasts', 'wargear', 40, $1)
        RETURNING id
        "#,
    )
    .bind(beast_type_id)
    .fetch_one(pool)
    .await
    .expect("插入异兽装备失败");

    let effect_type_id = insert_effect_type(
        pool,
        "IntegTest Targeting",
        "equipment",
        r#"{"credits_increase": 10}"#,
    )
    .await;
    let effect_equipment_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO equipment (equipment_name, equipment_category, equipment_type, cost)
        VALUES ('IntegTest Infra-sight', 'Gunsights', 'wargear', 20)
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .expect("插入效果装备失败");
    sqlx::query(
        "INSERT INTO equipment_granted_effects (equipment_id, fighter_effect_type_id) VALUES ($1, $2)",
    )
    .bind(effect_equipment_id)
    .bind(effect_type_id)
    .execute(pool)
    .await
    .expect("关联装备效果失败");

    let vehicle_type_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO vehicle_types (vehicle_type, gang_type_id, cost, movement, hull_points)
        VALUES ('IntegTest Ridgehauler', $1, 120, 7, 4)
        RETURNING id
        "#,
    )
    .bind(seed.gang_type_id)
    .fetch_one(pool)
    .await
    .expect("插入载具类型失败");

    let captured_injury_id = insert_effect_type(
        pool,
        "IntegTest Captured",
        "injuries",
        r#"{"captured": true}"#,
    )
    .await;
    let plain_injury_id =
        insert_effect_type(pool, "IntegTest Spinal Injury", "injuries", "{}").await;

    CascadeSeed {
        beast_equipment_id,
        effect_equipment_id,
        effect_type_id,
        vehicle_type_id,
        captured_injury_id,
        plain_injury_id,
    }
}

async fn insert_effect_type(pool: &PgPool, name: &str, category: &str, data: &str) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO fighter_effect_types (effect_name, fighter_effect_category_id, type_specific_data)
        SELECT $1, id, $3::jsonb FROM fighter_effect_categories WHERE category_name = $2
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(category)
    .bind(data)
    .fetch_one(pool)
    .await
    .expect("插入效果类型失败")
}

async fn cleanup_cascade(pool: &PgPool, extra: &CascadeSeed) {
    for id in [extra.beast_equipment_id, extra.effect_equipment_id] {
        sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .ok();
    }
    for id in [
        extra.effect_type_id,
        extra.captured_injury_id,
        extra.plain_injury_id,
    ] {
        sqlx::query("DELETE FROM fighter_effect_types WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .ok();
    }
}

async fn create_gang(services: &Services, seed: &Seed, name: &str) -> Uuid {
    services
        .gangs
        .create_gang(
            seed.user_id,
            CreateGangRequest {
                name: name.to_string(),
                gang_type_id: seed.gang_type_id,
                alignment: None,
            },
        )
        .await
        .unwrap()
        .id
}

async fn recruit(services: &Services, seed: &Seed, gang_id: Uuid) -> Uuid {
    services
        .fighters
        .add_fighter(
            seed.user_id,
            AddFighterRequest {
                gang_id,
                fighter_type: FighterTypeSource::Catalog(seed.fighter_type_id),
                fighter_name: FirstName().fake(),
                cost_override: None,
            },
        )
        .await
        .unwrap()
        .fighter
        .id
}

async fn stored_rating(pool: &PgPool, gang_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT rating FROM gangs WHERE id = $1")
        .bind(gang_id)
        .fetch_one(pool)
        .await
        .expect("查询评分失败")
}

/// 增量维护的 gangs.rating 必须等于费用聚合的结果，返回该评分
async fn assert_rating_consistent(pool: &PgPool, gang_id: Uuid) -> i32 {
    let costs = RatingRepository::new(pool.clone())
        .fighter_costs(gang_id)
        .await
        .unwrap();
    let rating = stored_rating(pool, gang_id).await;
    assert_eq!(rating, rating_of(&costs));
    rating
}

async fn fighter_total(pool: &PgPool, fighter_id: Uuid) -> i32 {
    RatingRepository::new(pool.clone())
        .fighter_cost(fighter_id)
        .await
        .unwrap()
        .map(|row| row.total())
        .unwrap_or(0)
}

async fn effect_count(pool: &PgPool, fighter_equipment_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM fighter_effects WHERE fighter_equipment_id = $1")
        .bind(fighter_equipment_id)
        .fetch_one(pool)
        .await
        .expect("查询效果失败")
}

async fn fighter_exists(pool: &PgPool, fighter_id: Uuid) -> bool {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM fighters WHERE id = $1)")
        .bind(fighter_id)
        .fetch_one(pool)
        .await
        .expect("查询战士失败")
}

async fn log_count(pool: &PgPool, gang_id: Uuid, action: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM gang_logs WHERE gang_id = $1 AND action_type = $2")
        .bind(gang_id)
        .bind(action)
        .fetch_one(pool)
        .await
        .expect("查询日志失败")
}

// ==================== 测试 ====================

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_recruit_equip_and_sell_keeps_rating_consistent() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;

    let gang = services
        .gangs
        .create_gang(
            seed.user_id,
            CreateGangRequest {
                name: "IntegTest Bruisers".to_string(),
                gang_type_id: seed.gang_type_id,
                alignment: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(gang.credits, STARTING_CREDITS);
    assert_eq!(gang.rating, 0);

    let added = services
        .fighters
        .add_fighter(
            seed.user_id,
            AddFighterRequest {
                gang_id: gang.id,
                fighter_type: FighterTypeSource::Catalog(seed.fighter_type_id),
                fighter_name: FirstName().fake(),
                cost_override: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(added.paid, 100);
    assert_eq!(added.credits, STARTING_CREDITS - 100);
    assert_eq!(added.rating_delta.value(), 100);

    let purchase = services
        .equipment
        .buy_equipment(
            seed.user_id,
            BuyEquipmentRequest {
                gang_id: gang.id,
                target: EquipmentHolder::Fighter(added.fighter.id),
                item: EquipmentSource::Catalog(seed.equipment_id),
                manual_cost: None,
                buy_for_free: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(purchase.credits, STARTING_CREDITS - 125);
    assert_eq!(purchase.rating_delta.value(), 25);

    let detail = services.gangs.get_gang(gang.id).await.unwrap();
    assert_eq!(detail.gang.rating, 125);
    assert_eq!(detail.fighters.len(), 1);
    assert_eq!(detail.fighters[0].total_cost, 125);

    let sale = services
        .equipment
        .sell_equipment(seed.user_id, purchase.fighter_equipment.id, Some(10))
        .await
        .unwrap();
    assert_eq!(sale.refund, 10);
    assert_eq!(sale.credits, STARTING_CREDITS - 115);
    assert_eq!(sale.rating_delta.value(), -25);

    // 增量维护的评分与从零重算一致
    let recalculated = services
        .gangs
        .recalculate_rating(seed.user_id, gang.id)
        .await
        .unwrap();
    assert_eq!(recalculated.drift(), 0);
    assert_eq!(recalculated.new_rating, 100);

    assert_eq!(log_count(&pool, gang.id, "fighter_added").await, 1);
    assert_eq!(log_count(&pool, gang.id, "equipment_bought").await, 1);
    assert_eq!(log_count(&pool, gang.id, "equipment_sold").await, 1);

    cleanup(&pool, &seed).await;
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_killed_fighter_leaves_rating() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;

    let gang = services
        .gangs
        .create_gang(
            seed.user_id,
            CreateGangRequest {
                name: "IntegTest Casualties".to_string(),
                gang_type_id: seed.gang_type_id,
                alignment: None,
            },
        )
        .await
        .unwrap();
    let added = services
        .fighters
        .add_fighter(
            seed.user_id,
            AddFighterRequest {
                gang_id: gang.id,
                fighter_type: FighterTypeSource::Catalog(seed.fighter_type_id),
                fighter_name: FirstName().fake(),
                cost_override: Some(80),
            },
        )
        .await
        .unwrap();
    assert_eq!(added.paid, 80);

    let killed = services
        .fighters
        .change_status(seed.user_id, added.fighter.id, StatusAction::Kill)
        .await
        .unwrap();
    assert!(killed.status.killed);
    assert_eq!(killed.rating_delta.value(), -100);

    // 重复操作不改变状态
    let err = services
        .fighters
        .change_status(seed.user_id, added.fighter.id, StatusAction::Kill)
        .await
        .unwrap_err();
    assert!(matches!(err, MundaError::Validation(_)));

    let resurrected = services
        .fighters
        .change_status(seed.user_id, added.fighter.id, StatusAction::Resurrect)
        .await
        .unwrap();
    assert_eq!(resurrected.rating_delta.value(), 100);

    let recalculated = services
        .gangs
        .recalculate_rating(seed.user_id, gang.id)
        .await
        .unwrap();
    assert_eq!(recalculated.drift(), 0);

    cleanup(&pool, &seed).await;
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_insufficient_credits_rolls_back() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;

    let gang = services
        .gangs
        .create_gang(
            seed.user_id,
            CreateGangRequest {
                name: "IntegTest Paupers".to_string(),
                gang_type_id: seed.gang_type_id,
                alignment: None,
            },
        )
        .await
        .unwrap();
    services
        .gangs
        .update_gang(
            seed.user_id,
            gang.id,
            GangChanges {
                credits_delta: Some(-(STARTING_CREDITS - 50)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = services
        .fighters
        .add_fighter(
            seed.user_id,
            AddFighterRequest {
                gang_id: gang.id,
                fighter_type: FighterTypeSource::Catalog(seed.fighter_type_id),
                fighter_name: FirstName().fake(),
                cost_override: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MundaError::InsufficientCredits {
            required: 100,
            available: 50
        }
    ));

    let detail = services.gangs.get_gang(gang.id).await.unwrap();
    assert_eq!(detail.gang.credits, 50);
    assert!(detail.fighters.is_empty());
    assert_eq!(log_count(&pool, gang.id, "fighter_added").await, 0);

    cleanup(&pool, &seed).await;
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_other_user_cannot_modify_gang() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;
    let intruder = seed_user(&pool).await;

    let gang = services
        .gangs
        .create_gang(
            seed.user_id,
            CreateGangRequest {
                name: "IntegTest Private".to_string(),
                gang_type_id: seed.gang_type_id,
                alignment: None,
            },
        )
        .await
        .unwrap();

    let err = services
        .gangs
        .delete_gang(intruder, gang.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MundaError::PermissionDenied(_)));

    sqlx::query("DELETE FROM profiles WHERE id = $1")
        .bind(intruder)
        .execute(&pool)
        .await
        .ok();
    cleanup(&pool, &seed).await;
}

async fn seed_user(pool: &PgPool) -> Uuid {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (id, username) VALUES ($1, $2)")
        .bind(user_id)
        .bind(format!("integ-{}", user_id.simple()))
        .execute(pool)
        .await
        .expect("插入测试用户失败");
    user_id
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_selling_beast_equipment_removes_beast() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;
    let extra = seed_cascade(&pool, &seed).await;

    let gang_id = create_gang(&services, &seed, "IntegTest Beastmasters").await;
    let owner = recruit(&services, &seed, gang_id).await;

    let purchase = services
        .equipment
        .buy_equipment(
            seed.user_id,
            BuyEquipmentRequest {
                gang_id,
                target: EquipmentHolder::Fighter(owner),
                item: EquipmentSource::Catalog(extra.beast_equipment_id),
                manual_cost: None,
                buy_for_free: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(purchase.exotic_beasts.len(), 1);
    let beast_id = purchase.exotic_beasts[0].id;
    let beast_total = fighter_total(&pool, beast_id).await;
    assert_eq!(purchase.rating_delta.value(), 40 + beast_total);
    let rating_before = assert_rating_consistent(&pool, gang_id).await;
    assert_eq!(rating_before, 100 + 40 + beast_total);

    // 生成异兽的装备不能移入仓库
    let err = services
        .equipment
        .move_to_stash(seed.user_id, purchase.fighter_equipment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MundaError::Validation(_)));

    let sale = services
        .equipment
        .sell_equipment(seed.user_id, purchase.fighter_equipment.id, None)
        .await
        .unwrap();
    assert_eq!(sale.refund, 40);
    assert_eq!(sale.removed_beasts, vec![beast_id]);
    assert_eq!(sale.rating_delta.value(), -(40 + beast_total));
    assert!(!fighter_exists(&pool, beast_id).await);

    let rating_after = assert_rating_consistent(&pool, gang_id).await;
    assert_eq!(rating_before - rating_after, 40 + beast_total);

    cleanup_cascade(&pool, &extra).await;
    cleanup(&pool, &seed).await;
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_stash_round_trip_moves_rating_and_effects() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;
    let extra = seed_cascade(&pool, &seed).await;

    let gang_id = create_gang(&services, &seed, "IntegTest Hoarders").await;
    let fighter_id = recruit(&services, &seed, gang_id).await;

    let purchase = services
        .equipment
        .buy_equipment(
            seed.user_id,
            BuyEquipmentRequest {
                gang_id,
                target: EquipmentHolder::Fighter(fighter_id),
                item: EquipmentSource::Catalog(extra.effect_equipment_id),
                manual_cost: None,
                buy_for_free: false,
            },
        )
        .await
        .unwrap();
    let item_id = purchase.fighter_equipment.id;
    assert_eq!(purchase.effects.len(), 1);
    assert_eq!(purchase.rating_delta.value(), 20 + 10);
    assert_eq!(effect_count(&pool, item_id).await, 1);
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 130);

    let stashed = services
        .equipment
        .move_to_stash(seed.user_id, item_id)
        .await
        .unwrap();
    assert_eq!(stashed.fighter_equipment.holder(), EquipmentHolder::Stash);
    assert_eq!(stashed.rating_delta.value(), -30);
    assert_eq!(effect_count(&pool, item_id).await, 0);
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 100);
    assert_eq!(fighter_total(&pool, fighter_id).await, 100);

    let taken = services
        .equipment
        .move_from_stash(seed.user_id, item_id, EquipmentHolder::Fighter(fighter_id))
        .await
        .unwrap();
    assert_eq!(
        taken.fighter_equipment.holder(),
        EquipmentHolder::Fighter(fighter_id)
    );
    assert_eq!(taken.effects.len(), 1);
    assert_eq!(taken.rating_delta.value(), 30);
    assert_eq!(effect_count(&pool, item_id).await, 1);
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 130);

    cleanup_cascade(&pool, &extra).await;
    cleanup(&pool, &seed).await;
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_assign_crew_moves_vehicle_cost_between_fighters() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;
    let extra = seed_cascade(&pool, &seed).await;

    let gang_id = create_gang(&services, &seed, "IntegTest Nomads").await;
    let first = recruit(&services, &seed, gang_id).await;
    let second = recruit(&services, &seed, gang_id).await;

    let added = services
        .vehicles
        .add_vehicle(
            seed.user_id,
            AddVehicleRequest {
                gang_id,
                vehicle_type_id: extra.vehicle_type_id,
                vehicle_name: "IntegTest Hauler".to_string(),
                cost_override: None,
                buy_for_free: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(added.paid, 120);
    assert!(added.vehicle.fighter_id.is_none());
    // 未分配载具只计入财富
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 200);

    let crewed = services
        .vehicles
        .assign_crew(seed.user_id, added.vehicle.id, Some(first))
        .await
        .unwrap();
    assert_eq!(crewed.rating_delta.value(), 120);
    assert_eq!(fighter_total(&pool, first).await, 220);
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 320);

    let swapped = services
        .vehicles
        .assign_crew(seed.user_id, added.vehicle.id, Some(second))
        .await
        .unwrap();
    assert_eq!(swapped.previous_fighter_id, Some(first));
    assert_eq!(swapped.vehicle.fighter_id, Some(second));
    assert!(swapped.rating_delta.is_zero());
    assert_eq!(fighter_total(&pool, first).await, 100);
    assert_eq!(fighter_total(&pool, second).await, 220);
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 320);

    cleanup_cascade(&pool, &extra).await;
    cleanup(&pool, &seed).await;
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_deleting_crew_unassigns_vehicle() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;
    let extra = seed_cascade(&pool, &seed).await;

    let gang_id = create_gang(&services, &seed, "IntegTest Wreckers").await;
    let driver = recruit(&services, &seed, gang_id).await;
    recruit(&services, &seed, gang_id).await;

    let vehicle = services
        .vehicles
        .add_vehicle(
            seed.user_id,
            AddVehicleRequest {
                gang_id,
                vehicle_type_id: extra.vehicle_type_id,
                vehicle_name: "IntegTest Cargo-8".to_string(),
                cost_override: None,
                buy_for_free: false,
            },
        )
        .await
        .unwrap()
        .vehicle;
    services
        .vehicles
        .assign_crew(seed.user_id, vehicle.id, Some(driver))
        .await
        .unwrap();

    let snapshot_total = fighter_total(&pool, driver).await;
    assert_eq!(snapshot_total, 220);
    let rating_before = assert_rating_consistent(&pool, gang_id).await;

    let deletion = services
        .fighters
        .delete_fighter(seed.user_id, driver)
        .await
        .unwrap();
    assert_eq!(deletion.unassigned_vehicles, vec![vehicle.id]);
    assert_eq!(deletion.rating_delta.value(), -snapshot_total);

    let crew: Option<Uuid> = sqlx::query_scalar("SELECT fighter_id FROM vehicles WHERE id = $1")
        .bind(vehicle.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(crew.is_none());

    let rating_after = assert_rating_consistent(&pool, gang_id).await;
    assert_eq!(rating_before - rating_after, snapshot_total);
    assert_eq!(rating_after, 100);

    cleanup_cascade(&pool, &extra).await;
    cleanup(&pool, &seed).await;
}

#[tokio::test]
#[ignore = "需要数据库和 Redis"]
async fn test_injury_flags_update_status() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let services = setup(&pool).await;
    let seed = seed(&pool).await;
    let extra = seed_cascade(&pool, &seed).await;

    let gang_id = create_gang(&services, &seed, "IntegTest Walking Wounded").await;
    let captive = recruit(&services, &seed, gang_id).await;
    let patient = recruit(&services, &seed, gang_id).await;

    let captured = services
        .injuries
        .add_injury(seed.user_id, captive, extra.captured_injury_id, false)
        .await
        .unwrap();
    assert!(captured.status.captured);
    assert!(!captured.status.recovery);
    // 被俘战士仍计入评分
    assert!(captured.rating_delta.is_zero());
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 200);

    let recovering = services
        .injuries
        .add_injury(seed.user_id, patient, extra.plain_injury_id, true)
        .await
        .unwrap();
    assert!(recovering.status.recovery);
    assert!(!recovering.status.captured);
    assert!(recovering.rating_delta.is_zero());
    assert_eq!(assert_rating_consistent(&pool, gang_id).await, 200);

    let flags: (bool, bool) =
        sqlx::query_as("SELECT captured, recovery FROM fighters WHERE id = $1")
            .bind(patient)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(flags, (false, true));

    // 非伤病类型被拒绝
    let err = services
        .injuries
        .add_injury(seed.user_id, patient, extra.effect_type_id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, MundaError::Validation(_)));
    assert_eq!(log_count(&pool, gang_id, "injury_added").await, 2);

    cleanup_cascade(&pool, &extra).await;
    cleanup(&pool, &seed).await;
}
