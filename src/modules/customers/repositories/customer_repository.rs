use crate::core::{AppError, Result, UnitOfWork};
use crate::modules::customers::models::{Customer, CustomerFilter};

/// Repository for customer database operations
pub struct CustomerRepository;

impl CustomerRepository {
    pub fn new() -> Self {
        Self
    }

    /// Insert a new customer or update an existing one, depending on
    /// whether it already carries an id.
    pub async fn save(&self, uow: &mut UnitOfWork, customer: &mut Customer) -> Result<i64> {
        customer.validate()?;

        match customer.id {
            Some(id) => {
                self.update(uow, customer).await?;
                Ok(id)
            }
            None => self.insert(uow, customer).await,
        }
    }

    async fn insert(&self, uow: &mut UnitOfWork, customer: &mut Customer) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO customer (
                company_id, name, email, address1, address2,
                postcode, city, pnr, telephone
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.company_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.address1)
        .bind(&customer.address2)
        .bind(&customer.postcode)
        .bind(&customer.city)
        .bind(&customer.pnr)
        .bind(&customer.telephone)
        .execute(uow.executor())
        .await
        .map_err(|e| AppError::database("insert customer", e))?;

        let id = result.last_insert_id() as i64;
        customer.id = Some(id);
        Ok(id)
    }

    async fn update(&self, uow: &mut UnitOfWork, customer: &Customer) -> Result<()> {
        let id = customer
            .id
            .ok_or_else(|| AppError::validation("Cannot update an unsaved customer"))?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE customer
            SET
                name = ?,
                email = ?,
                address1 = ?,
                address2 = ?,
                postcode = ?,
                city = ?,
                pnr = ?,
                telephone = ?
            WHERE id = ? AND company_id = ?
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.address1)
        .bind(&customer.address2)
        .bind(&customer.postcode)
        .bind(&customer.city)
        .bind(&customer.pnr)
        .bind(&customer.telephone)
        .bind(id)
        .bind(customer.company_id)
        .execute(uow.executor())
        .await
        .map_err(|e| AppError::database("update customer", e))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Customer not found"));
        }

        Ok(())
    }

    /// Singleton lookup. Zero matches is an expected outcome; more than
    /// one is an integrity violation.
    pub async fn get(
        &self,
        uow: &mut UnitOfWork,
        filter: &CustomerFilter,
    ) -> Result<Option<Customer>> {
        let mut customers = self.list(uow, filter).await?;

        match customers.len() {
            0 => Ok(None),
            1 => Ok(Some(customers.remove(0))),
            n => Err(AppError::too_many_rows(format!(
                "Customer lookup matched {} rows",
                n
            ))),
        }
    }

    pub async fn list(
        &self,
        uow: &mut UnitOfWork,
        filter: &CustomerFilter,
    ) -> Result<Vec<Customer>> {
        let mut sql = String::from(
            r#"
            SELECT
                id, company_id, name, email, address1, address2,
                postcode, city, pnr, telephone
            FROM customer
            "#,
        );

        let mut conditions: Vec<&str> = Vec::new();
        if filter.id.is_some() {
            conditions.push("id = ?");
        }
        if filter.company_id.is_some() {
            conditions.push("company_id = ?");
        }
        if filter.search.is_some() {
            conditions.push("(name LIKE ? OR email LIKE ?)");
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        // Order column comes from a fixed whitelist, never from input
        let order_by = match filter.order_by.as_deref() {
            Some("email") => "email",
            Some("city") => "city",
            _ => "name",
        };
        let direction = if filter.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}", order_by, direction));

        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
            if filter.offset.is_some() {
                sql.push_str(" OFFSET ?");
            }
        }

        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s));

        let mut query = sqlx::query_as::<_, CustomerRecord>(&sql);
        if let Some(id) = filter.id {
            query = query.bind(id);
        }
        if let Some(company_id) = filter.company_id {
            query = query.bind(company_id);
        }
        if let Some(pattern) = &search_pattern {
            query = query.bind(pattern).bind(pattern);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
            if let Some(offset) = filter.offset {
                query = query.bind(offset);
            }
        }

        let records = query
            .fetch_all(uow.executor())
            .await
            .map_err(|e| AppError::database("list customers", e))?;

        Ok(records.into_iter().map(Customer::from).collect())
    }
}

impl Default for CustomerRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Database row for the customer table
#[derive(sqlx::FromRow)]
struct CustomerRecord {
    id: i64,
    company_id: i64,
    name: String,
    email: String,
    address1: String,
    address2: String,
    postcode: String,
    city: String,
    pnr: String,
    telephone: String,
}

impl From<CustomerRecord> for Customer {
    fn from(record: CustomerRecord) -> Self {
        Customer {
            id: Some(record.id),
            name: record.name,
            email: record.email,
            address1: record.address1,
            address2: record.address2,
            postcode: record.postcode,
            city: record.city,
            pnr: record.pnr,
            telephone: record.telephone,
            company_id: record.company_id,
        }
    }
}
