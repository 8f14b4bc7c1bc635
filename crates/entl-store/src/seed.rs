//! Demo fixture: the catalog, plans and subscriptions an operator sees in
//! a fresh console. Loaded when the server starts without a snapshot and
//! written out by `entl seed`.
//!
//! All timestamps are fixed so the fixture always produces the same
//! matrix digests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use entl_core::{
    BillingCycle, Branch, BranchId, BranchRoleRow, CompanyId, CustomerId, EntlError, EntlResult,
    Feature, FeatureId, GrantType, Module, ModuleId, ModuleRoleAssignment, PermissionFlags,
    PermissionGrant, Plan, PlanId, PlanLimits, PlanStatus, PlanType, Price, RenewalMode, Role,
    SubscriptionId, Timestamp, Validity,
};
use entl_state::{Subscription, SubscriptionStatus};

use crate::snapshot::{CatalogSnapshot, PlanSnapshot, StoreSnapshot, SNAPSHOT_VERSION};

const SEEDED_AT: &str = "2024-01-01T00:00:00Z";

const MODULES: &[(&str, &str, GrantType)] = &[
    ("erp_central", "ERP Central", GrantType::SingleRole),
    ("maintenance_service", "Maintenance & Service", GrantType::BranchRole),
    ("hrms", "HRMS", GrantType::SingleRole),
    ("finance", "Financial Accounting", GrantType::SingleRole),
    ("inventory", "Inventory", GrantType::SingleRole),
    ("crm", "CRM", GrantType::SingleRole),
];

const FEATURES: &[(&str, &str, &str)] = &[
    ("erp_central.project_tracking", "erp_central", "Project Tracking"),
    ("erp_central.document_control", "erp_central", "Document Control"),
    ("maintenance_service.work_orders", "maintenance_service", "Work Orders"),
    ("maintenance_service.preventive_maintenance", "maintenance_service", "Preventive Maintenance"),
    ("finance.journal_entry", "finance", "Journal Entry"),
    ("finance.bank_reconciliation", "finance", "Bank Reconciliation"),
    ("finance.financial_reports", "finance", "Financial Reports"),
    ("hrms.employee_directory", "hrms", "Employee Directory"),
    ("hrms.payroll_processing", "hrms", "Payroll Processing"),
    ("hrms.leave_management", "hrms", "Leave Management"),
    ("inventory.stock_adjustment", "inventory", "Stock Adjustment"),
    ("inventory.warehouse_transfer", "inventory", "Warehouse Transfer"),
    ("crm.leads", "crm", "Leads"),
    ("crm.opportunities", "crm", "Opportunities"),
];

const BRANCHES: &[(&str, &str, &str)] = &[
    ("b1", "Holistic O&G Kenya", "holistic"),
    ("b2", "Holistic O&G Global", "holistic"),
    ("b3", "Holistic Oil & Gas", "holistic"),
    ("b4", "DigiNergy", "diginergy"),
    ("b5", "ABC", "abc"),
];

/// `(feature, view, create, edit, delete, approve)` for the Professional plan.
const PROFESSIONAL_GRANTS: &[(&str, [bool; 5])] = &[
    ("finance.journal_entry", [true, true, true, false, true]),
    ("finance.bank_reconciliation", [true, true, false, false, false]),
    ("finance.financial_reports", [true, false, false, false, false]),
    ("hrms.employee_directory", [true, true, true, false, false]),
    ("hrms.payroll_processing", [true, true, true, false, true]),
    ("hrms.leave_management", [true, true, true, true, true]),
    ("inventory.stock_adjustment", [true, true, false, false, true]),
    ("inventory.warehouse_transfer", [true, true, true, false, false]),
    ("crm.leads", [true, true, true, false, false]),
];

const STARTER_GRANTS: &[(&str, [bool; 5])] = &[
    ("finance.journal_entry", [true, true, false, false, false]),
    ("finance.financial_reports", [true, false, false, false, false]),
    ("hrms.employee_directory", [true, true, true, false, false]),
    ("hrms.leave_management", [true, true, false, false, false]),
];

const TRIAL_GRANTS: &[(&str, [bool; 5])] = &[
    ("hrms.employee_directory", [true, false, false, false, false]),
    ("hrms.leave_management", [true, false, false, false, false]),
    ("finance.financial_reports", [true, false, false, false, false]),
];

fn flags([view, create, edit, delete, approve]: [bool; 5]) -> PermissionFlags {
    PermissionFlags {
        view,
        create,
        edit,
        delete,
        approve,
    }
}

fn date(y: i32, m: u32, d: u32) -> EntlResult<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| EntlError::validation(format!("invalid date {y}-{m}-{d}")))
}

fn modules(ids: &[&str]) -> EntlResult<BTreeSet<ModuleId>> {
    ids.iter().map(|id| ModuleId::new(*id)).collect()
}

fn grants(plan: &PlanId, table: &[(&str, [bool; 5])]) -> EntlResult<Vec<PermissionGrant>> {
    table
        .iter()
        .map(|(feature, f)| PermissionGrant::new(plan.clone(), FeatureId::new(*feature)?, flags(*f)))
        .collect()
}

fn single(pairs: &[(&str, &str)]) -> EntlResult<BTreeMap<ModuleId, ModuleRoleAssignment>> {
    pairs
        .iter()
        .map(|(module, role)| {
            Ok((
                ModuleId::new(*module)?,
                ModuleRoleAssignment::SingleRole {
                    role: Role::new(*role)?,
                },
            ))
        })
        .collect()
}

struct PlanSeed {
    id: &'static str,
    name: &'static str,
    plan_type: PlanType,
    price: Price,
    validity: Validity,
    limits: (u32, u32, u32),
    renewal: RenewalMode,
    modules: &'static [&'static str],
}

fn plan(seed: PlanSeed, at: Timestamp) -> EntlResult<Plan> {
    let (user_limit, external_user_limit, company_limit) = seed.limits;
    let plan = Plan {
        id: PlanId::new(seed.id)?,
        name: seed.name.to_string(),
        plan_type: seed.plan_type,
        price: seed.price,
        validity: seed.validity,
        limits: PlanLimits {
            user_limit,
            external_user_limit,
            company_limit,
        },
        upgrade_allowed: true,
        downgrade_allowed: seed.plan_type != PlanType::Trial,
        renewal: seed.renewal,
        status: PlanStatus::Active,
        modules: modules(seed.modules)?,
        created_at: at,
        updated_at: at,
    };
    plan.validate()?;
    Ok(plan)
}

struct SubscriptionSeed {
    id: &'static str,
    customer_id: &'static str,
    customer_name: &'static str,
    plan_id: &'static str,
    start: NaiveDate,
    end: NaiveDate,
    status: SubscriptionStatus,
    billing_cycle: BillingCycle,
    auto_renew: bool,
    billing_contact: &'static str,
}

fn subscription(seed: SubscriptionSeed, at: Timestamp) -> EntlResult<Subscription> {
    Ok(Subscription {
        id: SubscriptionId::new(seed.id)?,
        customer_id: CustomerId::new(seed.customer_id)?,
        customer_name: seed.customer_name.to_string(),
        plan_id: PlanId::new(seed.plan_id)?,
        start_date: seed.start,
        end_date: seed.end,
        billing_cycle: seed.billing_cycle,
        status: seed.status,
        auto_renew: seed.auto_renew,
        module_overrides: BTreeMap::new(),
        billing_contact: Some(seed.billing_contact.to_string()),
        direct_debit: false,
        custom_domain: false,
        created_at: at,
        transitions: Vec::new(),
    })
}

fn catalog() -> EntlResult<CatalogSnapshot> {
    Ok(CatalogSnapshot {
        modules: MODULES
            .iter()
            .map(|(id, name, grant_type)| Module::new(ModuleId::new(*id)?, *name, *grant_type))
            .collect::<EntlResult<_>>()?,
        features: FEATURES
            .iter()
            .map(|(id, module, name)| {
                Feature::new(FeatureId::new(*id)?, ModuleId::new(*module)?, *name)
            })
            .collect::<EntlResult<_>>()?,
        branches: BRANCHES
            .iter()
            .map(|(id, name, company)| {
                Branch::new(BranchId::new(*id)?, *name, CompanyId::new(*company)?)
            })
            .collect::<EntlResult<_>>()?,
    })
}

/// Build the demo fixture.
pub fn demo_snapshot() -> EntlResult<StoreSnapshot> {
    let at = Timestamp::parse(SEEDED_AT)?;

    let starter = plan(
        PlanSeed {
            id: "PLN-001",
            name: "Starter Pack",
            plan_type: PlanType::Monthly,
            price: Price::usd(9_900),
            validity: Validity::Days(30),
            limits: (5, 0, 1),
            renewal: RenewalMode::Auto,
            modules: &["hrms", "finance"],
        },
        at,
    )?;
    let professional = plan(
        PlanSeed {
            id: "PLN-002",
            name: "Professional",
            plan_type: PlanType::Yearly,
            price: Price::usd(99_900),
            validity: Validity::Days(365),
            limits: (50, 10, 5),
            renewal: RenewalMode::Auto,
            modules: &["hrms", "finance", "inventory", "crm"],
        },
        at,
    )?;
    let enterprise = plan(
        PlanSeed {
            id: "PLN-003",
            name: "Enterprise Plus",
            plan_type: PlanType::Enterprise,
            price: Price::Custom,
            validity: Validity::Custom(365),
            limits: (500, 100, 20),
            renewal: RenewalMode::Manual,
            modules: &[
                "erp_central",
                "maintenance_service",
                "hrms",
                "finance",
                "inventory",
                "crm",
            ],
        },
        at,
    )?;
    let trial = plan(
        PlanSeed {
            id: "PLN-004",
            name: "Trial Plan",
            plan_type: PlanType::Trial,
            price: Price::usd(0),
            validity: Validity::Days(14),
            limits: (3, 0, 1),
            renewal: RenewalMode::None,
            modules: &["hrms", "finance"],
        },
        at,
    )?;

    let enterprise_grants = FEATURES
        .iter()
        .map(|(feature, _, _)| {
            PermissionGrant::new(
                enterprise.id.clone(),
                FeatureId::new(*feature)?,
                PermissionFlags::ALLOW_ALL,
            )
        })
        .collect::<EntlResult<Vec<_>>>()?;

    let mut enterprise_roles = single(&[
        ("erp_central", "Project User"),
        ("hrms", "HR Manager"),
        ("finance", "Finance Manager"),
        ("inventory", "Inventory Manager"),
        ("crm", "Sales Manager"),
    ])?;
    let mut branch_rows = Vec::new();
    for (id, _, _) in BRANCHES {
        let branch_id = BranchId::new(*id)?;
        branch_rows.push(if *id == "b5" {
            BranchRoleRow::enabled(branch_id, Role::new("Company Admin")?).as_default()
        } else {
            BranchRoleRow {
                branch_id,
                role: None,
                enabled: false,
                is_default: false,
            }
        });
    }
    enterprise_roles.insert(
        ModuleId::new("maintenance_service")?,
        ModuleRoleAssignment::BranchRole {
            branches: branch_rows,
        },
    );

    let plans = vec![
        PlanSnapshot {
            grants: grants(&starter.id, STARTER_GRANTS)?,
            assignments: single(&[("hrms", "Employee"), ("finance", "Accountant")])?,
            plan: starter,
        },
        PlanSnapshot {
            grants: grants(&professional.id, PROFESSIONAL_GRANTS)?,
            assignments: single(&[
                ("hrms", "HR Manager"),
                ("finance", "Accountant"),
                ("inventory", "Store Keeper"),
                ("crm", "Sales User"),
            ])?,
            plan: professional,
        },
        PlanSnapshot {
            grants: enterprise_grants,
            assignments: enterprise_roles,
            plan: enterprise,
        },
        // Finance is left without a role so the console shows an
        // unconfigured module out of the box.
        PlanSnapshot {
            grants: grants(&trial.id, TRIAL_GRANTS)?,
            assignments: single(&[("hrms", "Employee")])?,
            plan: trial,
        },
    ];

    let subscriptions = vec![
        subscription(
            SubscriptionSeed {
                id: "sub_1",
                customer_id: "cust-acme",
                customer_name: "Acme Corp",
                plan_id: "PLN-003",
                start: date(2024, 1, 1)?,
                end: date(2024, 12, 31)?,
                status: SubscriptionStatus::Active,
                billing_cycle: BillingCycle::Yearly,
                auto_renew: false,
                billing_contact: "it@acme.example",
            },
            at,
        )?,
        subscription(
            SubscriptionSeed {
                id: "sub_2",
                customer_id: "cust-global-tech",
                customer_name: "Global Tech",
                plan_id: "PLN-002",
                start: date(2024, 2, 15)?,
                end: date(2024, 3, 15)?,
                status: SubscriptionStatus::Trial,
                billing_cycle: BillingCycle::Monthly,
                auto_renew: true,
                billing_contact: "it@globaltech.example",
            },
            at,
        )?,
        subscription(
            SubscriptionSeed {
                id: "sub_3",
                customer_id: "cust-small-biz",
                customer_name: "Small Biz Inc",
                plan_id: "PLN-001",
                start: date(2023, 11, 1)?,
                end: date(2023, 11, 30)?,
                status: SubscriptionStatus::Expired,
                billing_cycle: BillingCycle::Monthly,
                auto_renew: false,
                billing_contact: "owner@smallbiz.example",
            },
            at,
        )?,
    ];

    Ok(StoreSnapshot {
        version: SNAPSHOT_VERSION,
        catalog: catalog()?,
        plans,
        subscriptions,
    })
}
