//! RecordPatch -> DbPatchable implementation.
//!
//! This sits in the `db` module because it contains SQL/table knowledge.

use async_trait::async_trait;
use chrono::Utc;
use gabinete_schema::{DemandUpdate, FieldUpdate};
use sqlx::SqliteConnection;
use tracing::debug;

use super::patch::{CabinetPatch, CalendarTokens, RecordPatch};
use super::traits::DbPatchable;
use crate::error::GabineteError;
use crate::utils::logging::with_pretty_json_debug;

#[async_trait]
impl DbPatchable for RecordPatch {
    async fn apply_patch(&self, conn: &mut SqliteConnection) -> Result<(), GabineteError> {
        match self {
            RecordPatch::Cabinet { id, patch } => {
                patch.validate()?;

                let CabinetPatch {
                    name,
                    plan,
                    parliamentary_name,
                    parliamentary_party,
                    parliamentary_photo,
                    official_name,
                    official_title,
                    header_url,
                    footer_url,
                    use_letterhead,
                    plan_tier,
                    mrr_value,
                    payment_method,
                    next_payment,
                    gemini_api_key,
                    openai_api_key,
                    agent_access_token,
                } = patch;

                let name_set = name.is_some();
                let plan_set = plan.is_some();
                let profile_set = parliamentary_name.is_touched()
                    || parliamentary_party.is_touched()
                    || parliamentary_photo.is_touched()
                    || official_name.is_touched()
                    || official_title.is_touched();
                let letterhead_set =
                    header_url.is_touched() || footer_url.is_touched() || use_letterhead.is_some();
                let billing_set = plan_tier.is_some()
                    || mrr_value.is_some()
                    || payment_method.is_touched()
                    || next_payment.is_touched();
                let gemini_api_key_set = gemini_api_key.is_touched();
                let openai_api_key_set = openai_api_key.is_touched();
                let agent_access_token_set = agent_access_token.is_touched();
                let updated_at = Utc::now();

                // Non-null columns go through COALESCE; nullable ones use a touched flag
                // so an explicit null clears them.
                let res = sqlx::query(
                    r#"
                    UPDATE cabinets
                    SET
                        name = COALESCE(?, name),
                        plan = COALESCE(?, plan),
                        parliamentary_name = CASE WHEN ? THEN ? ELSE parliamentary_name END,
                        parliamentary_party = CASE WHEN ? THEN ? ELSE parliamentary_party END,
                        parliamentary_photo = CASE WHEN ? THEN ? ELSE parliamentary_photo END,
                        official_name = CASE WHEN ? THEN ? ELSE official_name END,
                        official_title = CASE WHEN ? THEN ? ELSE official_title END,
                        header_url = CASE WHEN ? THEN ? ELSE header_url END,
                        footer_url = CASE WHEN ? THEN ? ELSE footer_url END,
                        use_letterhead = COALESCE(?, use_letterhead),
                        plan_tier = COALESCE(?, plan_tier),
                        mrr_value = COALESCE(?, mrr_value),
                        payment_method = CASE WHEN ? THEN ? ELSE payment_method END,
                        next_payment = CASE WHEN ? THEN ? ELSE next_payment END,
                        gemini_api_key = CASE WHEN ? THEN ? ELSE gemini_api_key END,
                        openai_api_key = CASE WHEN ? THEN ? ELSE openai_api_key END,
                        agent_access_token = CASE WHEN ? THEN ? ELSE agent_access_token END,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(name.as_deref())
                .bind(*plan)
                .bind(parliamentary_name.is_touched())
                .bind(text(parliamentary_name))
                .bind(parliamentary_party.is_touched())
                .bind(text(parliamentary_party))
                .bind(parliamentary_photo.is_touched())
                .bind(text(parliamentary_photo))
                .bind(official_name.is_touched())
                .bind(text(official_name))
                .bind(official_title.is_touched())
                .bind(text(official_title))
                .bind(header_url.is_touched())
                .bind(text(header_url))
                .bind(footer_url.is_touched())
                .bind(text(footer_url))
                .bind(*use_letterhead)
                .bind(plan_tier.as_deref())
                .bind(*mrr_value)
                .bind(payment_method.is_touched())
                .bind(text(payment_method))
                .bind(next_payment.is_touched())
                .bind(next_payment.as_value().copied())
                .bind(gemini_api_key.is_touched())
                .bind(text(gemini_api_key))
                .bind(openai_api_key.is_touched())
                .bind(text(openai_api_key))
                .bind(agent_access_token.is_touched())
                .bind(text(agent_access_token))
                .bind(updated_at)
                .bind(id)
                .execute(&mut *conn)
                .await?;

                let affected = res.rows_affected();
                debug!(
                    table = "cabinets",
                    %id,
                    affected,
                    updated_at = %updated_at,
                    name_set,
                    plan_set,
                    profile_set,
                    letterhead_set,
                    billing_set,
                    gemini_api_key_set,
                    openai_api_key_set,
                    agent_access_token_set,
                    "db patch applied"
                );

                if affected == 0 {
                    return Err(GabineteError::not_found("cabinet", id));
                }

                Ok(())
            }

            RecordPatch::CalendarTokens { id, tokens } => {
                let CalendarTokens {
                    access_token,
                    refresh_token,
                    expires_at,
                    calendar_id,
                    email,
                } = tokens.clone();

                let refresh_token_set = refresh_token.is_some();
                let calendar_id_set = calendar_id.is_some();
                let email_set = email.is_some();
                let updated_at = Utc::now();

                let res = sqlx::query(
                    r#"
                    UPDATE cabinets
                    SET
                        google_access_token = ?,
                        google_refresh_token = COALESCE(?, google_refresh_token),
                        google_token_expires_at = ?,
                        google_calendar_id = COALESCE(?, google_calendar_id),
                        google_email = COALESCE(?, google_email),
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(access_token)
                .bind(refresh_token)
                .bind(expires_at)
                .bind(calendar_id)
                .bind(email)
                .bind(updated_at)
                .bind(id)
                .execute(&mut *conn)
                .await?;

                let affected = res.rows_affected();
                debug!(
                    table = "cabinets",
                    %id,
                    affected,
                    updated_at = %updated_at,
                    expires_at,
                    refresh_token_set,
                    calendar_id_set,
                    email_set,
                    "calendar tokens stored"
                );

                if affected == 0 {
                    return Err(GabineteError::not_found("cabinet", id));
                }

                Ok(())
            }

            RecordPatch::DisconnectCalendar { id } => {
                let updated_at = Utc::now();

                let res = sqlx::query(
                    r#"
                    UPDATE cabinets
                    SET
                        google_access_token = NULL,
                        google_refresh_token = NULL,
                        google_token_expires_at = NULL,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(updated_at)
                .bind(id)
                .execute(&mut *conn)
                .await?;

                let affected = res.rows_affected();
                debug!(table = "cabinets", %id, affected, "calendar disconnected");

                if affected == 0 {
                    return Err(GabineteError::not_found("cabinet", id));
                }

                Ok(())
            }

            RecordPatch::Demand {
                cabinet_id,
                id,
                patch,
            } => {
                patch.validate()?;
                with_pretty_json_debug(patch, |body| {
                    debug!(table = "demands", id, %cabinet_id, patch = %body, "demand patch body");
                });

                let DemandUpdate {
                    title,
                    description,
                    beneficiary,
                    author,
                    category,
                    status,
                    priority,
                    obs,
                    assigned_to,
                } = patch;

                let updated_at = Utc::now();

                // Required columns go through COALESCE (Clear was rejected above);
                // optional ones use a touched flag so an explicit null clears them.
                let res = sqlx::query(
                    r#"
                    UPDATE demands
                    SET
                        title = COALESCE(?, title),
                        description = CASE WHEN ? THEN ? ELSE description END,
                        beneficiary = CASE WHEN ? THEN ? ELSE beneficiary END,
                        author = CASE WHEN ? THEN ? ELSE author END,
                        category = CASE WHEN ? THEN ? ELSE category END,
                        status = COALESCE(?, status),
                        priority = COALESCE(?, priority),
                        obs = CASE WHEN ? THEN ? ELSE obs END,
                        assigned_to = CASE WHEN ? THEN ? ELSE assigned_to END,
                        updated_at = ?
                    WHERE id = ? AND cabinet_id = ?
                    "#,
                )
                .bind(text(title))
                .bind(description.is_touched())
                .bind(text(description))
                .bind(beneficiary.is_touched())
                .bind(text(beneficiary))
                .bind(author.is_touched())
                .bind(text(author))
                .bind(category.is_touched())
                .bind(text(category))
                .bind(text(status))
                .bind(text(priority))
                .bind(obs.is_touched())
                .bind(text(obs))
                .bind(assigned_to.is_touched())
                .bind(text(assigned_to))
                .bind(updated_at)
                .bind(id)
                .bind(cabinet_id)
                .execute(&mut *conn)
                .await?;

                let affected = res.rows_affected();
                debug!(
                    table = "demands",
                    id,
                    %cabinet_id,
                    affected,
                    updated_at = %updated_at,
                    title_set = title.is_touched(),
                    description_set = description.is_touched(),
                    status_set = status.is_touched(),
                    priority_set = priority.is_touched(),
                    assigned_to_set = assigned_to.is_touched(),
                    "db patch applied"
                );

                if affected == 0 {
                    return Err(GabineteError::not_found("demand", id));
                }

                Ok(())
            }
        }
    }
}

fn text(field: &FieldUpdate<String>) -> Option<&str> {
    field.as_value().map(String::as_str)
}
