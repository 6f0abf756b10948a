//! The SIGEC client sheet layout.
//!
//! Columns are declared block by block in sheet order. New fields go at the
//! end through [`SchemaBuilder::extending`]; reordering the tables below
//! moves stored data and breaks every existing sheet.

use crate::error::Result;
use crate::schema::{FieldSpec, GroupField, SchemaBuilder, SchemaRegistry};
use crate::value::ValueKind::{Boolean, Date, Numeric, Text, Timestamp};

pub const CLIENT_SCHEMA_VERSION: u32 = 1;

/// Worksheet holding one row per client.
pub const CLIENT_SHEET: &str = "Clientes";

pub const PARTNER_GROUP: &str = "partner";
pub const CONTACT_GROUP: &str = "contact";
pub const POWER_OF_ATTORNEY_GROUP: &str = "power_of_attorney";

/// Creation timestamp, kept across updates.
pub const CREATED_AT_FIELD: &str = "criado_em";

const COMPANY: &[FieldSpec<'static>] = &[
    ("razao_social", Text),
    ("nome_fantasia", Text),
    ("cnpj", Text),
    ("perfil", Text),
    ("inscricao_estadual", Text),
    ("inscricao_municipal", Text),
    ("estado", Text),
    ("cidade", Text),
    ("regime_federal", Text),
    ("regime_estadual", Text),
    ("segmento", Text),
    ("atividade", Text),
];

const SERVICES: &[FieldSpec<'static>] = &[
    ("servico_ct", Boolean),
    ("servico_fs", Boolean),
    ("servico_dp", Boolean),
    ("servico_bpo_financeiro", Boolean),
    ("responsavel_servicos", Text),
    ("data_inicio_servicos", Date),
    ("codigo_fortes_ct", Text),
    ("codigo_fortes_fs", Text),
    ("codigo_fortes_ps", Text),
    ("codigo_dominio", Text),
    ("sistema_utilizado", Text),
    ("modulo_sped_trier", Text),
];

const PARTNER: &[GroupField<'static>] = &[
    ("nome", Text),
    ("cpf", Text),
    ("email", Text),
    ("telefone", Text),
    ("participacao", Numeric),
    ("administrador", Boolean),
];

const CONTACTS: &[FieldSpec<'static>] = &[
    ("telefone_fixo", Text),
    ("telefone_celular", Text),
    ("whatsapp", Text),
    ("email_principal", Text),
    ("email_secundario", Text),
    ("responsavel_imediato", Text),
    ("contato_contador", Text),
    ("telefone_contador", Text),
    ("email_contador", Text),
];

const CONTACT: &[GroupField<'static>] = &[
    ("nome", Text),
    ("cargo", Text),
    ("telefone", Text),
    ("email", Text),
];

const SYSTEMS: &[FieldSpec<'static>] = &[
    ("sistema_principal", Text),
    ("versao_sistema", Text),
    ("codigo_acesso_simples", Text),
    ("cpf_cnpj_acesso", Text),
    ("portal_cliente_ativo", Boolean),
    ("integracao_dominio", Boolean),
    ("sistema_onvio", Boolean),
];

const CREDENTIALS: &[FieldSpec<'static>] = &[
    ("acesso_iss", Text),
    ("senha_iss", Text),
    ("acesso_sefin", Text),
    ("senha_sefin", Text),
    ("acesso_seuma", Text),
    ("senha_seuma", Text),
    ("acesso_empweb", Text),
    ("senha_empweb", Text),
    ("acesso_fap_inss", Text),
    ("senha_fap_inss", Text),
    ("acesso_crf", Text),
    ("senha_crf", Text),
    ("email_gestor", Text),
    ("senha_email_gestor", Text),
    ("anvisa_gestor", Text),
    ("anvisa_empresa", Text),
    ("acesso_ibama", Text),
    ("senha_ibama", Text),
    ("acesso_semace", Text),
    ("senha_semace", Text),
];

/// One slot per agency (RFB, state revenue, Caixa, social security,
/// municipality, other).
const POWER_OF_ATTORNEY: &[GroupField<'static>] = &[
    ("orgao", Text),
    ("possui", Boolean),
    ("data", Date),
];

const POWER_OF_ATTORNEY_NOTES: &[FieldSpec<'static>] = &[
    ("outras_procuracoes", Text),
    ("observacoes_procuracoes", Text),
];

const NOTES: &[FieldSpec<'static>] = &[
    ("observacoes_gerais", Text),
    ("tarefas_vinculadas", Numeric),
    ("status_cliente", Text),
    ("ultima_atualizacao", Timestamp),
    ("responsavel_atualizacao", Text),
    ("prioridade", Text),
    ("tags", Text),
    ("historico_alteracoes", Text),
];

fn scalars(builder: SchemaBuilder, fields: &[FieldSpec<'_>]) -> SchemaBuilder {
    fields
        .iter()
        .fold(builder, |builder, (name, kind)| builder.scalar(*name, *kind))
}

/// Version 1 of the client sheet.
pub fn client_schema() -> Result<SchemaRegistry> {
    let builder = SchemaBuilder::new(CLIENT_SCHEMA_VERSION)
        .scalar("nome_empresa", Text)
        .required();
    let builder = scalars(builder, COMPANY);
    let builder = scalars(builder, SERVICES).group(PARTNER_GROUP, 10, PARTNER);
    let builder = scalars(builder, CONTACTS).group(CONTACT_GROUP, 5, CONTACT);
    let builder = scalars(builder, SYSTEMS);
    let builder = scalars(builder, CREDENTIALS).group(POWER_OF_ATTORNEY_GROUP, 6, POWER_OF_ATTORNEY);
    let builder = scalars(builder, POWER_OF_ATTORNEY_NOTES);
    scalars(builder, NOTES)
        .scalar(crate::record::ID_FIELD, Text)
        .required()
        .scalar("ativo", Boolean)
        .scalar(CREATED_AT_FIELD, Timestamp)
        .preserve_on_update()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_and_pins_its_layout() {
        let schema = client_schema().expect("client schema is valid");
        assert_eq!(schema.version(), CLIENT_SCHEMA_VERSION);
        assert_eq!(schema.width(), 172);
        assert_eq!(schema.column_for("nome_empresa"), Ok(1));
        assert_eq!(schema.column_for("partner_1_nome"), Ok(26));
        assert_eq!(schema.column_for("id"), Ok(170));
        assert_eq!(schema.column_for(CREATED_AT_FIELD), Ok(172));
    }

    #[test]
    fn groups_reserve_their_full_blocks() {
        let schema = client_schema().expect("client schema is valid");
        let spans: Vec<_> = schema.groups().map(|g| (g.name.as_str(), g.span())).collect();
        assert_eq!(
            spans,
            vec![
                (CONTACT_GROUP, (95, 114)),
                (PARTNER_GROUP, (26, 85)),
                (POWER_OF_ATTORNEY_GROUP, (142, 159)),
            ]
        );
    }

    #[test]
    fn identity_and_company_name_are_required() {
        let schema = client_schema().expect("client schema is valid");
        let required: Vec<_> = schema
            .columns()
            .iter()
            .filter(|c| c.required)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(required, vec!["nome_empresa", "id"]);
        assert!(
            schema
                .column_named(CREATED_AT_FIELD)
                .map(|c| c.preserve_on_update)
                .unwrap_or(false)
        );
    }
}
